use std::{
    fmt,
    future::Future,
    thread::{self, ThreadId},
};

use tokio::{runtime::Runtime, task::LocalSet};

/// The single thread that owns all render state and view construction.
///
/// This is a thin wrapper around a tokio [`LocalSet`] that remembers which
/// thread created it. [`BoundView`][crate::BoundView]s have to be created
/// inside of it, since that's where their values are applied; the producers
/// feeding them keep running on the runtime's worker threads.
///
/// ```
/// use futures_util::stream;
/// use reactive_view::{bind, Placeholder, UiThread};
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
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ui = UiThread::new();
/// ui.run_until(async {
///     let mut view = bind(stream::iter([1, 2]), |n: &i32| Node::Text(n.to_string()));
///     assert_eq!(*view.body(), Node::Stack);
///
///     while view.changed().await.is_some() {}
///     assert_eq!(*view.body(), Node::Text("2".to_owned()));
/// })
/// .await;
/// # }
/// ```
pub struct UiThread {
    local: LocalSet,
    id: ThreadId,
}

impl UiThread {
    /// Create a `UiThread` for the current thread.
    #[must_use]
    pub fn new() -> Self {
        Self { local: LocalSet::new(), id: thread::current().id() }
    }

    /// The id of the thread this `UiThread` belongs to.
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Whether the calling thread is this `UiThread`.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    /// Run `future` on the UI thread, along with all bound views created
    /// during its execution, until it completes.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.local.run_until(future).await
    }

    /// Run `future` to completion on `runtime`, with the calling thread as
    /// the UI thread.
    ///
    /// This is the blocking counterpart of [`run_until`][Self::run_until] for
    /// use from a synchronous `main` function.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the one that created this
    /// `UiThread`, or from within an asynchronous execution context.
    #[track_caller]
    pub fn block_on<F: Future>(&self, runtime: &Runtime, future: F) -> F::Output {
        assert!(self.is_current(), "UiThread::block_on called from a foreign thread");
        self.local.block_on(runtime, future)
    }
}

impl Default for UiThread {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UiThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiThread").field("id", &self.id).finish_non_exhaustive()
    }
}
