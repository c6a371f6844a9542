//! The list and detail screens, and the navigation between them.

use std::{collections::BTreeMap, sync::Arc};

use futures_util::{
    future::{select_all, LocalBoxFuture},
    stream::BoxStream,
    FutureExt,
};
use reactive_view::{
    reactive_view, BoundView, Placeholder, ReactiveBuilder, RenderState, StreamViewExt,
};

use crate::{
    combine::{combine_latest, prepend_none},
    model::{DataState, Image, Item},
    node::Node,
    source::DataSource,
};

fn list_body(state: &DataState) -> Node {
    match state {
        DataState::Loading => Node::text("Loading..."),
        DataState::Data(items) => {
            Node::List(items.iter().map(|item| Node::Slot(item.id)).collect())
        }
    }
}

/// One row of the list: the item's name, linking to its detail screen.
struct Row {
    source: Arc<dyn DataSource>,
    item: Item,
}

impl ReactiveBuilder for Row {
    type Data = String;
    type Content = Node;

    fn source(&self) -> BoxStream<'static, String> {
        self.source.name(&self.item)
    }

    fn create_body(&self, name: &String) -> Node {
        Node::Link { label: Box::new(Node::text(name.as_str())), destination: self.item.id }
    }
}

pub(crate) struct ListScreen {
    source: Arc<dyn DataSource>,
    items: BoundView<DataState, Node>,
    rows: BTreeMap<usize, BoundView<String, Node>>,
    synced_version: u64,
}

impl ListScreen {
    pub(crate) fn new(source: Arc<dyn DataSource>) -> Self {
        let items = reactive_view(source.items(), list_body);
        Self { source, items, rows: BTreeMap::new(), synced_version: 0 }
    }

    /// Bring the rows in line with the latest list of items.
    ///
    /// Rows are keyed by item id: a row that was already there keeps its
    /// subscription and only takes over the new description.
    pub(crate) fn sync_rows(&mut self) {
        let version = self.items.version();
        if version == self.synced_version {
            return;
        }
        self.synced_version = version;

        let RenderState::Present(DataState::Data(items)) = self.items.state() else {
            self.rows.clear();
            return;
        };

        self.rows.retain(|id, _| items.iter().any(|item| item.id == *id));
        for item in items {
            let row = Row { source: Arc::clone(&self.source), item };
            match self.rows.get_mut(&item.id) {
                Some(view) => view.reconcile(row.binding()),
                None => {
                    self.rows.insert(item.id, row.into_view());
                }
            }
        }

        tracing::debug!(rows = self.rows.len(), "Synced list rows");
    }

    pub(crate) fn body(&self) -> Node {
        let fill = |id: usize| match self.rows.get(&id) {
            Some(row) => row.body().clone(),
            None => Node::placeholder(),
        };
        self.items.body().clone().fill_slots(&fill)
    }

    fn views(&mut self) -> impl Iterator<Item = LocalBoxFuture<'_, Option<()>>> {
        let rows = self.rows.values_mut().map(|row| row.changed().boxed_local());
        std::iter::once(self.items.changed().boxed_local()).chain(rows)
    }

    #[cfg(test)]
    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

type Detail = (Option<Image>, Option<String>);

fn detail_body((image, description): &Detail) -> Node {
    let image = image.clone().map(Node::Image);
    let description = description.clone().map(Node::Text);
    Node::Stack(image.into_iter().chain(description).collect())
}

pub(crate) struct DetailScreen {
    item: Item,
    view: BoundView<Detail, Node>,
}

impl DetailScreen {
    pub(crate) fn new(source: &dyn DataSource, item: Item) -> Self {
        let image = prepend_none(source.image(&item));
        let description = prepend_none(source.description(&item));
        let view = combine_latest(image, description).view(detail_body);
        Self { item, view }
    }

    pub(crate) fn body(&self) -> Node {
        self.view.body().clone()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.view.is_finished()
    }
}

/// The list screen with an optional detail screen pushed on top.
pub(crate) struct App {
    source: Arc<dyn DataSource>,
    list: ListScreen,
    detail: Option<DetailScreen>,
}

impl App {
    pub(crate) fn new(source: Arc<dyn DataSource>) -> Self {
        let list = ListScreen::new(Arc::clone(&source));
        Self { source, list, detail: None }
    }

    /// Push the detail screen of the item `id`.
    pub(crate) fn open(&mut self, id: usize) {
        tracing::info!(item = id, "Opening detail screen");
        self.detail = Some(DetailScreen::new(&*self.source, Item::new(id)));
    }

    /// Pop the detail screen, tearing down its view.
    pub(crate) fn close(&mut self) {
        if let Some(detail) = self.detail.take() {
            tracing::info!(item = detail.item.id, "Closing detail screen");
        }
    }

    pub(crate) fn detail(&self) -> Option<&DetailScreen> {
        self.detail.as_ref()
    }

    pub(crate) fn body(&self) -> Node {
        let mut screens = vec![self.list.body()];
        screens.extend(self.detail.as_ref().map(DetailScreen::body));
        Node::Navigation(screens)
    }

    /// Wait until any view on screen was rendered again.
    ///
    /// Returns `false` once every source has completed and all renders were
    /// observed.
    pub(crate) async fn changed(&mut self) -> bool {
        let changed = {
            let detail = self.detail.as_mut().map(|detail| detail.view.changed().boxed_local());
            let mut pending: Vec<_> = self.list.views().chain(detail).collect();

            loop {
                if pending.is_empty() {
                    break false;
                }
                let (changed, _, rest) = select_all(pending).await;
                if changed.is_some() {
                    break true;
                }
                pending = rest;
            }
        };

        self.list.sync_rows();
        changed
    }
}
