//! Fan-out of a single stream subscription to many consumers.
//!
//! [`StreamMulticaster::wrap`] turns any [`Stream`] into a
//! [`MulticastHandle`]. The handle polls the wrapped stream at most once over
//! its whole lifetime, no matter how many consumers are attached to it, and
//! hands every value it receives to every consumer attached at that moment.
//!
//! Attaching twice does **not** create two underlying subscriptions: both
//! consumers share the one the handle already has. If you need independent
//! subscriptions, wrap two independent streams.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use futures_core::Stream;
use futures_util::{stream::BoxStream, StreamExt};
use slab::Slab;
use tokio::task::JoinHandle;

mod subscriber;

pub use self::subscriber::MulticastStream;

/// What a consumer attaching to a [`MulticastHandle`] gets to see of values
/// emitted before it attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Replay {
    /// Late consumers only see values emitted after they attached.
    #[default]
    None,
    /// Late consumers immediately receive the most recently emitted value,
    /// followed by all future values.
    Last,
}

/// Entry point for wrapping streams.
///
/// This type can't be instantiated, it only groups the constructors of
/// [`MulticastHandle`].
#[allow(missing_debug_implementations)]
pub enum StreamMulticaster {}

impl StreamMulticaster {
    /// Wrap `stream` in a future-only [`MulticastHandle`].
    ///
    /// The stream is not polled until the first consumer attaches.
    pub fn wrap<S>(stream: S) -> MulticastHandle<S::Item>
    where
        S: Stream + Send + 'static,
        S::Item: Clone + Send + 'static,
    {
        Self::wrap_with(stream, Replay::None)
    }

    /// Wrap `stream` in a [`MulticastHandle`] that replays the most recent
    /// value to consumers attaching late.
    pub fn wrap_replay_last<S>(stream: S) -> MulticastHandle<S::Item>
    where
        S: Stream + Send + 'static,
        S::Item: Clone + Send + 'static,
    {
        Self::wrap_with(stream, Replay::Last)
    }

    /// Wrap `stream` in a [`MulticastHandle`] with the given replay behavior.
    pub fn wrap_with<S>(stream: S, replay: Replay) -> MulticastHandle<S::Item>
    where
        S: Stream + Send + 'static,
        S::Item: Clone + Send + 'static,
    {
        MulticastHandle::new(stream.boxed(), replay)
    }
}

/// Extension trait to wrap a stream without naming [`StreamMulticaster`].
pub trait MulticastExt: Stream {
    /// Shorthand for [`StreamMulticaster::wrap(self)`][StreamMulticaster::wrap].
    fn multicast(self) -> MulticastHandle<Self::Item>
    where
        Self: Sized + Send + 'static,
        Self::Item: Clone + Send + 'static,
    {
        StreamMulticaster::wrap(self)
    }

    /// Shorthand for
    /// [`StreamMulticaster::wrap_replay_last(self)`][StreamMulticaster::wrap_replay_last].
    fn multicast_replay_last(self) -> MulticastHandle<Self::Item>
    where
        Self: Sized + Send + 'static,
        Self::Item: Clone + Send + 'static,
    {
        StreamMulticaster::wrap_replay_last(self)
    }
}

impl<S: Stream> MulticastExt for S {}

/// A stream that is subscribed to at most once and broadcast to any number of
/// attached consumers.
///
/// Clones of a `MulticastHandle` share the same subscription. The underlying
/// stream is dropped once the last clone is dropped, or once it completes.
///
/// # Panics
///
/// The wrapped stream is driven by a task spawned onto the current tokio
/// runtime when the first consumer attaches, so [`attach`][Self::attach] and
/// [`subscribe`][Self::subscribe] panic when called outside of one.
pub struct MulticastHandle<T> {
    inner: Arc<HandleInner<T>>,
}

impl<T: Clone + Send + 'static> MulticastHandle<T> {
    fn new(source: BoxStream<'static, T>, replay: Replay) -> Self {
        let registry = Registry {
            consumers: Slab::new(),
            replay,
            last: None,
            finished: false,
        };

        Self {
            inner: Arc::new(HandleInner {
                registry: Arc::new(Mutex::new(registry)),
                connection: Mutex::new(Connection { source: Some(source), task: None }),
            }),
        }
    }

    /// Register a consumer.
    ///
    /// `on_value` is called with every value emitted from now on, in the
    /// order the wrapped stream produced them. It is called from whichever
    /// thread drives the wrapped stream, so it should return quickly: the
    /// next value isn't handed out before every consumer got the current one.
    /// With [`Replay::Last`], it is also called once with the most recent
    /// value before `attach` returns.
    ///
    /// The consumer stays registered until the returned [`Subscription`] is
    /// dropped or [detached][Subscription::detach]. Detaching never waits for
    /// a value that is currently being handed out; a detached consumer is not
    /// called anymore, even for that value.
    pub fn attach<F>(&self, on_value: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let mut registry = self.inner.registry.lock().unwrap();
        if let Some(last) = &registry.last {
            on_value(last.clone());
        }

        if registry.finished {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "reactive_view::multicast", "attach after completion");

            return Subscription::inert();
        }

        let consumer = Consumer { on_value: Box::new(on_value), detached: AtomicBool::new(false) };
        let key = registry.consumers.insert(Arc::new(consumer));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "reactive_view::multicast",
            consumers = registry.consumers.len(),
            "attach(key = {key})"
        );

        drop(registry);
        self.connect();

        let registry: Weak<dyn Detach> = Arc::downgrade(&self.inner.registry) as _;
        Subscription { registry: Some(registry), key }
    }

    /// Attach a consumer that receives the values as a [`Stream`].
    ///
    /// The returned stream ends once the wrapped stream completes or every
    /// clone of this handle has been dropped.
    pub fn subscribe(&self) -> MulticastStream<T> {
        MulticastStream::new(self)
    }

    /// Start driving the wrapped stream, unless that already happened.
    fn connect(&self) {
        let mut connection = self.inner.connection.lock().unwrap();
        if let Some(source) = connection.source.take() {
            let registry = Arc::clone(&self.inner.registry);
            connection.task = Some(tokio::spawn(drive(source, registry)));
        }
    }
}

impl<T> MulticastHandle<T> {
    /// The number of consumers currently attached.
    pub fn consumer_count(&self) -> usize {
        self.inner.registry.lock().unwrap().consumers.len()
    }

    /// The number of times the wrapped stream has been subscribed to.
    ///
    /// This is `0` before the first consumer attached and `1` afterwards, it
    /// never goes any higher.
    pub fn subscription_count(&self) -> usize {
        usize::from(self.inner.connection.lock().unwrap().task.is_some())
    }

    /// Whether the wrapped stream has completed.
    pub fn is_finished(&self) -> bool {
        self.inner.registry.lock().unwrap().finished
    }
}

impl<T> Clone for MulticastHandle<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for MulticastHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock().unwrap();
        f.debug_struct("MulticastHandle")
            .field("consumers", &registry.consumers.len())
            .field("replay", &registry.replay)
            .field("finished", &registry.finished)
            .finish_non_exhaustive()
    }
}

struct HandleInner<T> {
    registry: Arc<Mutex<Registry<T>>>,
    connection: Mutex<Connection<T>>,
}

impl<T> Drop for HandleInner<T> {
    fn drop(&mut self) {
        if let Some(task) = self.connection.get_mut().ok().and_then(|c| c.task.take()) {
            task.abort();
        }

        // The aborted driver only releases the registry once it's polled
        // again; release the consumers now.
        if let Ok(mut registry) = self.registry.lock() {
            registry.finish();
        }
    }
}

struct Connection<T> {
    /// The wrapped stream, until the first consumer attaches.
    source: Option<BoxStream<'static, T>>,
    /// The task driving the wrapped stream, after the first consumer attached.
    task: Option<JoinHandle<()>>,
}

struct Consumer<T> {
    on_value: Box<dyn Fn(T) + Send + Sync>,
    detached: AtomicBool,
}

impl<T> Consumer<T> {
    fn call(&self, value: T) {
        if !self.detached.load(Ordering::Acquire) {
            (self.on_value)(value);
        }
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }
}

struct Registry<T> {
    consumers: Slab<Arc<Consumer<T>>>,
    replay: Replay,
    /// The most recent value, only kept for [`Replay::Last`].
    last: Option<T>,
    finished: bool,
}

impl<T: Clone> Registry<T> {
    /// Record `value` for replay and collect the consumers it goes to.
    ///
    /// Both happen under the same lock, so a consumer attaching concurrently
    /// either gets `value` through the broadcast or through the replay, never
    /// both.
    fn prepare(&mut self, value: &T, targets: &mut Vec<Arc<Consumer<T>>>) {
        targets.extend(self.consumers.iter().map(|(_, consumer)| Arc::clone(consumer)));

        if self.replay == Replay::Last {
            self.last = Some(value.clone());
        }
    }
}

impl<T> Registry<T> {
    fn finish(&mut self) {
        self.finished = true;
        // Dropping the consumers drops their channel senders, which is how
        // stream-based consumers learn about completion.
        for consumer in self.consumers.drain() {
            consumer.detach();
        }
    }
}

/// Hand `value` to every consumer in `targets`, without holding the registry
/// lock.
fn broadcast<T: Clone>(value: T, targets: &mut Vec<Arc<Consumer<T>>>) {
    #[cfg(feature = "tracing")]
    tracing::trace!(
        target: "reactive_view::multicast",
        "Broadcasting to {} consumers",
        targets.len()
    );

    for consumer in targets.drain(..) {
        consumer.call(value.clone());
    }
}

async fn drive<T: Clone>(mut source: BoxStream<'static, T>, registry: Arc<Mutex<Registry<T>>>) {
    #[cfg(feature = "tracing")]
    tracing::debug!(target: "reactive_view::multicast", "Subscribing to source stream");

    let mut targets = Vec::new();
    while let Some(value) = source.next().await {
        registry.lock().unwrap().prepare(&value, &mut targets);
        broadcast(value, &mut targets);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(target: "reactive_view::multicast", "Source stream completed");

    registry.lock().unwrap().finish();
}

trait Detach: Send + Sync {
    fn contains(&self, key: usize) -> bool;
    fn detach(&self, key: usize);
}

impl<T: Send> Detach for Mutex<Registry<T>> {
    fn contains(&self, key: usize) -> bool {
        self.lock().is_ok_and(|registry| registry.consumers.contains(key))
    }

    fn detach(&self, key: usize) {
        // A poisoned registry has no consumers left worth keeping.
        let Ok(mut registry) = self.lock() else { return };

        // After completion the slab was cleared and no keys get handed out
        // anymore, so `key` can't refer to somebody else's consumer.
        let removed = registry.consumers.try_remove(key);
        if let Some(consumer) = &removed {
            // It may still be part of a broadcast in progress.
            consumer.detach();
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "reactive_view::multicast",
            removed = removed.is_some(),
            consumers = registry.consumers.len(),
            "detach(key = {key})"
        );
    }
}

/// Token for a consumer attached to a [`MulticastHandle`].
///
/// Dropping it detaches the consumer. Other consumers of the same handle are
/// not affected and the wrapped stream is neither re-subscribed nor
/// cancelled.
#[must_use = "dropping a `Subscription` detaches the consumer immediately"]
pub struct Subscription {
    registry: Option<Weak<dyn Detach>>,
    key: usize,
}

impl Subscription {
    fn inert() -> Self {
        Self { registry: None, key: 0 }
    }

    /// Whether this subscription still refers to a registered consumer.
    ///
    /// Returns `false` after [`detach`][Self::detach] and once the wrapped
    /// stream completed or every clone of the handle was dropped.
    pub fn is_attached(&self) -> bool {
        self.registry
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|registry| registry.contains(self.key))
    }

    /// Detach the consumer.
    ///
    /// Equivalent to dropping the subscription. Detaching is idempotent:
    /// calling this on an already-detached subscription does nothing.
    pub fn detach(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.key);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
