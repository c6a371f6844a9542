use std::{
    cell::Cell,
    rc::Rc,
    sync::{atomic::AtomicUsize, Arc},
};

use futures_util::stream::{self, BoxStream, StreamExt};
use reactive_view::{
    reactive_view, MulticastExt, Placeholder, ReactiveBuilder, StreamViewExt, UiThread,
};

use crate::{channel, count, counted, settle, text, Node};

struct Counter {
    label: &'static str,
    subscriptions: Arc<AtomicUsize>,
    values: Vec<i32>,
    bodies_built: Rc<Cell<usize>>,
}

impl ReactiveBuilder for Counter {
    type Data = i32;
    type Content = Node;

    fn source(&self) -> BoxStream<'static, i32> {
        counted(&self.subscriptions, stream::iter(self.values.clone())).boxed()
    }

    fn create_body(&self, state: &i32) -> Node {
        self.bodies_built.set(self.bodies_built.get() + 1);
        Node::Text(format!("{}: {state}", self.label))
    }
}

#[tokio::test]
async fn capability_renders_like_bind() {
    UiThread::new()
        .run_until(async {
            let subscriptions = Arc::new(AtomicUsize::new(0));
            let bodies_built = Rc::new(Cell::new(0));
            let mut view = Counter {
                label: "count",
                subscriptions: Arc::clone(&subscriptions),
                values: vec![1, 2, 3],
                bodies_built: Rc::clone(&bodies_built),
            }
            .into_view();

            assert_eq!(*view.body(), Node::placeholder());
            while view.changed().await.is_some() {}

            assert_eq!(*view.body(), Node::Text("count: 3".to_owned()));
            assert_eq!(bodies_built.get(), 3);
            assert_eq!(count(&subscriptions), 1);
        })
        .await;
}

#[tokio::test]
async fn capability_rebuild_does_not_resubscribe() {
    UiThread::new()
        .run_until(async {
            let subscriptions = Arc::new(AtomicUsize::new(0));
            let bodies_built = Rc::new(Cell::new(0));
            let describe = |label| Counter {
                label,
                subscriptions: Arc::clone(&subscriptions),
                values: vec![7],
                bodies_built: Rc::clone(&bodies_built),
            };

            let mut view = describe("first").into_view();
            while view.changed().await.is_some() {}
            assert_eq!(*view.body(), Node::Text("first: 7".to_owned()));

            view.reconcile(describe("second").binding());
            view.reconcile(describe("third").binding());
            settle().await;

            assert_eq!(*view.body(), Node::Text("third: 7".to_owned()));
            assert_eq!(count(&subscriptions), 1);
            assert_eq!(bodies_built.get(), 3);
        })
        .await;
}

#[tokio::test]
async fn all_entry_points_agree() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel();
            let handle = source.multicast();

            let mut free = reactive_view(handle.subscribe(), text);
            let mut extension = handle.subscribe().view(text);

            for value in [3, 1, 4] {
                tx.send(value).unwrap();
                free.changed().await;
                extension.changed().await;
                assert_eq!(*free.body(), *extension.body());
                assert_eq!(*free.body(), text(&value));
            }
        })
        .await;
}

#[tokio::test]
async fn view_on_never_emitting_channel() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel::<i32>();
            let view = source.view(text);

            settle().await;
            assert_eq!(*view.body(), Node::placeholder());

            drop(view);
            settle().await;
            // The view took the only subscription with it.
            assert!(tx.is_closed());
        })
        .await;
}
