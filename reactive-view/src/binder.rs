//! The stream → view bridge.
//!
//! A [`BoundView`] holds the [`RenderState`] of one node in a view tree. It
//! is fed by a [`MulticastHandle`], renders a [`Placeholder`] until the first
//! value arrives and renders the caller's callback with the latest value from
//! then on.
//!
//! Values usually arrive on a runtime worker thread. They are never applied
//! there: the consumer a `BoundView` attaches only forwards them through a
//! channel to a task running on the UI thread, which is the only place the
//! state is ever touched. The state lives behind an `Rc`, so a `BoundView`
//! can't be sent to another thread in the first place.

use std::{
    cell::{RefCell, RefMut},
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
    thread::{self, ThreadId},
};

use futures_core::Stream;
use futures_util::{stream::BoxStream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    multicast::{MulticastHandle, StreamMulticaster, Subscription},
    state::{RenderCell, RenderState},
    BodyGuard,
};

/// A view node type that can stand in for content that isn't there yet.
///
/// The placeholder is what a [`BoundView`] renders before its source emitted
/// anything. It must be a real, non-degenerate node (some containers refuse
/// to host an empty child), for instance an empty stack rather than "nothing".
pub trait Placeholder {
    /// Create the placeholder node.
    fn placeholder() -> Self;
}

type Render<T, V> = Box<dyn Fn(&T) -> V>;

/// Bind `source` to `render`.
///
/// This wraps `source` with [`StreamMulticaster::wrap`] exactly once, so the
/// returned view owns the only subscription to it. Re-running the code that
/// builds a view description does not affect an existing `BoundView`; see
/// [`ViewBinding`] and [`BoundView::reconcile`] for keeping one alive across
/// re-renders of its parent.
///
/// # Panics
///
/// Panics when called outside of a tokio [`LocalSet`][tokio::task::LocalSet]
/// (see [`UiThread`][crate::UiThread]).
pub fn bind<S, F, V>(source: S, render: F) -> BoundView<S::Item, V>
where
    S: Stream + Send + 'static,
    S::Item: Clone + Send + 'static,
    F: Fn(&S::Item) -> V + 'static,
    V: Placeholder + 'static,
{
    ViewBinding::new(source, render).mount()
}

/// Bind an already-wrapped stream to `render`.
///
/// Any number of views can be bound to the same handle; the wrapped stream
/// is still only subscribed to once. Each view only sees values emitted
/// after it was bound (unless the handle replays, see
/// [`Replay`][crate::Replay]).
///
/// # Panics
///
/// Panics when called outside of a tokio [`LocalSet`][tokio::task::LocalSet].
pub fn bind_to<T, F, V>(handle: &MulticastHandle<T>, render: F) -> BoundView<T, V>
where
    T: Clone + Send + 'static,
    F: Fn(&T) -> V + 'static,
    V: Placeholder + 'static,
{
    BoundView::attach(handle.clone(), Box::new(render))
}

/// A description of a bound view: a source stream and a render callback.
///
/// Creating a `ViewBinding` doesn't subscribe to anything, so it's cheap to
/// create one on every render pass of a parent view. Only
/// [`mount`][Self::mount] subscribes; [`BoundView::reconcile`] takes over the
/// render callback and throws the source away untouched.
pub struct ViewBinding<T, V> {
    source: BoxStream<'static, T>,
    render: Render<T, V>,
}

impl<T, V> ViewBinding<T, V>
where
    T: Clone + Send + 'static,
    V: Placeholder + 'static,
{
    /// Create a new description.
    pub fn new<S, F>(source: S, render: F) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        F: Fn(&T) -> V + 'static,
    {
        Self { source: source.boxed(), render: Box::new(render) }
    }

    /// Turn this description into a live view.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio
    /// [`LocalSet`][tokio::task::LocalSet].
    pub fn mount(self) -> BoundView<T, V> {
        BoundView::attach(StreamMulticaster::wrap(self.source), self.render)
    }
}

impl<T, V> fmt::Debug for ViewBinding<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBinding").finish_non_exhaustive()
    }
}

struct Binder<T, V> {
    cell: RenderCell<T, V>,
    render: Render<T, V>,
    ui_thread: ThreadId,
}

impl<T, V> Binder<T, V> {
    fn apply(&mut self, value: T) {
        assert_ui_thread(self.ui_thread);
        self.cell.transition(value, &*self.render);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "reactive_view::binder",
            version = self.cell.version(),
            "Rendered new value"
        );
    }

    fn finish(&mut self) {
        assert_ui_thread(self.ui_thread);
        self.cell.finish();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "reactive_view::binder",
            present = self.cell.state().is_present(),
            "Source completed"
        );
    }
}

fn assert_ui_thread(ui_thread: ThreadId) {
    debug_assert_eq!(
        thread::current().id(),
        ui_thread,
        "render state must only be touched on the thread that created the view"
    );
}

/// A live, re-rendering node of a view tree.
///
/// Created by [`bind`], [`bind_to`], [`ViewBinding::mount`] or one of the
/// convenience entry points in [`crate::builder`]. The surrounding UI reads
/// the current node with [`body`][Self::body] and waits for the next render
/// with [`changed`][Self::changed].
///
/// Dropping a `BoundView` releases its subscription; no render callback is
/// invoked afterwards. There is no other way to cancel it.
pub struct BoundView<T, V> {
    binder: Rc<RefCell<Binder<T, V>>>,
    observed_version: u64,
    task: JoinHandle<()>,
    // Detached before `handle` is released.
    subscription: Subscription,
    handle: MulticastHandle<T>,
}

impl<T, V> BoundView<T, V>
where
    T: Clone + Send + 'static,
    V: Placeholder + 'static,
{
    fn attach(handle: MulticastHandle<T>, render: Render<T, V>) -> Self {
        let binder = Rc::new(RefCell::new(Binder {
            cell: RenderCell::new(V::placeholder()),
            render,
            ui_thread: thread::current().id(),
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::task::spawn_local(receive(rx, Rc::downgrade(&binder)));
        let subscription = handle.attach(move |value| {
            // The hop to the UI thread. A send error means the view is gone.
            let _ = tx.send(value);
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "reactive_view::binder", ?subscription, "Bound view");

        Self { binder, observed_version: 0, task, subscription, handle }
    }

    /// Adopt the render callback of a fresh description of this view.
    ///
    /// The description's source is dropped without being subscribed to; this
    /// view keeps its existing subscription and state. If a value is present,
    /// the node is rendered again with the new callback.
    pub fn reconcile(&mut self, binding: ViewBinding<T, V>) {
        let ViewBinding { source, render } = binding;
        drop(source);

        let mut binder = self.binder.borrow_mut();
        binder.render = render;
        let Binder { cell, render, .. } = &mut *binder;
        cell.rerender(&**render);
    }
}

impl<T, V> BoundView<T, V> {
    /// Read the current node.
    ///
    /// This is the placeholder until the first value arrived.
    ///
    /// While the returned guard is alive, the view can't be re-rendered:
    /// values arriving in the meantime are applied once it's dropped. Don't
    /// hold on to it across an `.await`.
    pub fn body(&self) -> BodyGuard<'_, V> {
        BodyGuard::new(self.binder.borrow(), |binder| binder.cell.node())
    }

    /// Get a clone of the current render state.
    pub fn state(&self) -> RenderState<T>
    where
        T: Clone,
    {
        self.binder.borrow().cell.state().clone()
    }

    /// Whether the source emitted at least one value.
    pub fn is_present(&self) -> bool {
        self.binder.borrow().cell.state().is_present()
    }

    /// The number of renders so far, `0` while showing the placeholder.
    pub fn version(&self) -> u64 {
        self.binder.borrow().cell.version()
    }

    /// Whether the source stream completed.
    ///
    /// The last rendered node stays in place after completion.
    pub fn is_finished(&self) -> bool {
        self.binder.borrow().cell.is_finished()
    }

    /// The handle this view receives its values from.
    ///
    /// Use it to bind further views to the same subscription with
    /// [`bind_to`].
    pub fn handle(&self) -> &MulticastHandle<T> {
        &self.handle
    }

    /// Wait until the view was rendered again.
    ///
    /// Resolves to `Some(())` if one or more renders happened since the last
    /// time this returned, and to `None` once the source completed and the
    /// final render was observed.
    ///
    /// If the render callback panics, the view stops updating, keeps the last
    /// node it rendered successfully and is considered finished.
    pub fn changed(&mut self) -> Changed<'_, T, V> {
        Changed { view: self, waker_key: None }
    }
}

impl<T, V> Drop for BoundView<T, V> {
    fn drop(&mut self) {
        self.task.abort();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "reactive_view::binder",
            subscription = ?self.subscription,
            "Tearing down bound view"
        );
    }
}

impl<T, V: fmt::Debug> fmt::Debug for BoundView<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binder = self.binder.borrow();
        f.debug_struct("BoundView")
            .field("body", binder.cell.node())
            .field("version", &binder.cell.version())
            .field("finished", &binder.cell.is_finished())
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

async fn receive<T, V>(mut rx: mpsc::UnboundedReceiver<T>, binder: Weak<RefCell<Binder<T, V>>>) {
    let _finish_on_panic = FinishOnPanic(binder.clone());

    while let Some(value) = rx.recv().await {
        let Some(strong) = binder.upgrade() else { return };
        borrow_binder(&strong).await.apply(value);
    }

    if let Some(strong) = binder.upgrade() {
        borrow_binder(&strong).await.finish();
    }
}

/// Borrow the binder as soon as no [`BodyGuard`] is alive anymore.
async fn borrow_binder<B>(binder: &RefCell<B>) -> RefMut<'_, B> {
    loop {
        if let Ok(binder) = binder.try_borrow_mut() {
            return binder;
        }
        tokio::task::yield_now().await;
    }
}

/// Marks the view finished if the render callback panics, which ends the
/// receiving task.
struct FinishOnPanic<T, V>(Weak<RefCell<Binder<T, V>>>);

impl<T, V> Drop for FinishOnPanic<T, V> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }

        if let Some(binder) = self.0.upgrade() {
            if let Ok(mut binder) = binder.try_borrow_mut() {
                binder.finish();
            }
        }
    }
}

/// Future returned by [`BoundView::changed`].
pub struct Changed<'a, T, V> {
    view: &'a mut BoundView<T, V>,
    waker_key: Option<usize>,
}

impl<T, V> Future for Changed<'_, T, V> {
    type Output = Option<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let mut binder = this.view.binder.borrow_mut();
        binder.cell.poll_changed(&mut this.view.observed_version, &mut this.waker_key, cx)
    }
}

impl<T, V> Drop for Changed<'_, T, V> {
    fn drop(&mut self) {
        if let Some(key) = self.waker_key {
            let observed_version = self.view.observed_version;
            self.view.binder.borrow_mut().cell.drop_waker(observed_version, key);
        }
    }
}

impl<T, V> fmt::Debug for Changed<'_, T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changed").field("observed_version", &self.view.observed_version).finish()
    }
}
