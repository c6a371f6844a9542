//! Convenience entry points on top of [`bind`].
//!
//! All of these end up in [`bind`] / [`ViewBinding::mount`], so they share the
//! single-subscription and UI-thread guarantees of [`BoundView`].

use futures_core::Stream;
use futures_util::stream::BoxStream;

use crate::{bind, BoundView, Placeholder, ViewBinding};

/// Create a view that renders `builder` with the latest value of `source`.
///
/// Equivalent to [`bind(source, builder)`][bind].
///
/// # Panics
///
/// Panics when called outside of a tokio [`LocalSet`][tokio::task::LocalSet].
pub fn reactive_view<S, F, V>(source: S, builder: F) -> BoundView<S::Item, V>
where
    S: Stream + Send + 'static,
    S::Item: Clone + Send + 'static,
    F: Fn(&S::Item) -> V + 'static,
    V: Placeholder + 'static,
{
    bind(source, builder)
}

/// Extension trait to bind any stream to a view.
pub trait StreamViewExt: Stream {
    /// Bind this stream to `builder`.
    ///
    /// Equivalent to [`bind(self, builder)`][bind].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio
    /// [`LocalSet`][tokio::task::LocalSet].
    fn view<F, V>(self, builder: F) -> BoundView<Self::Item, V>
    where
        Self: Sized + Send + 'static,
        Self::Item: Clone + Send + 'static,
        F: Fn(&Self::Item) -> V + 'static,
        V: Placeholder + 'static,
    {
        bind(self, builder)
    }
}

impl<S: Stream> StreamViewExt for S {}

/// A type that describes a view by a source stream and a way to build its
/// content from the values of that stream.
///
/// Implementing the two required members is enough to get a fully bound view
/// through [`into_view`][Self::into_view]; the subscription and render state
/// handling is the same as for [`bind`].
///
/// ```
/// use futures_util::stream::{self, BoxStream, StreamExt};
/// use reactive_view::{Placeholder, ReactiveBuilder, UiThread};
///
/// #[derive(Debug, PartialEq)]
/// enum Node {
///     Stack,
///     Text(String),
/// }
///
/// impl Placeholder for Node {
///     fn placeholder() -> Self {
///         Node::Stack
///     }
/// }
///
/// struct Greeting;
///
/// impl ReactiveBuilder for Greeting {
///     type Data = String;
///     type Content = Node;
///
///     fn source(&self) -> BoxStream<'static, String> {
///         stream::iter(["world".to_owned()]).boxed()
///     }
///
///     fn create_body(&self, name: &String) -> Node {
///         Node::Text(format!("Hello, {name}!"))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// UiThread::new()
///     .run_until(async {
///         let mut view = Greeting.into_view();
///         view.changed().await;
///         assert_eq!(*view.body(), Node::Text("Hello, world!".to_owned()));
///     })
///     .await;
/// # }
/// ```
pub trait ReactiveBuilder {
    /// The values the source stream emits.
    type Data: Clone + Send + 'static;

    /// The view node built from a value.
    type Content: Placeholder + 'static;

    /// Create the source stream.
    ///
    /// This may be called every time a description of the view is created,
    /// but the stream is only subscribed to when the view is first mounted.
    fn source(&self) -> BoxStream<'static, Self::Data>;

    /// Build the content for the given value.
    fn create_body(&self, state: &Self::Data) -> Self::Content;

    /// Describe this view without subscribing to anything.
    ///
    /// Pass the result to [`BoundView::reconcile`] to update a view that is
    /// already mounted.
    fn binding(self) -> ViewBinding<Self::Data, Self::Content>
    where
        Self: Sized + 'static,
    {
        let source = self.source();
        ViewBinding::new(source, move |state: &Self::Data| self.create_body(state))
    }

    /// Mount this view.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio
    /// [`LocalSet`][tokio::task::LocalSet].
    fn into_view(self) -> BoundView<Self::Data, Self::Content>
    where
        Self: Sized + 'static,
    {
        self.binding().mount()
    }
}
