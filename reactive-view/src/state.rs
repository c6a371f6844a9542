use std::{
    mem,
    task::{Context, Poll, Waker},
};

use slab::Slab;

/// The value a bound view currently renders from.
///
/// Starts out [`Absent`][Self::Absent] and becomes
/// [`Present`][Self::Present] with the first emission of the source stream.
/// Every later emission replaces the value. There is no way back to `Absent`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderState<T> {
    /// No value was emitted yet.
    Absent,
    /// The most recently emitted value.
    Present(T),
}

impl<T> RenderState<T> {
    /// Get a reference to the current value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Absent => None,
            Self::Present(value) => Some(value),
        }
    }

    /// Whether a value was emitted yet.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    fn transition(&mut self, value: T) {
        *self = Self::Present(value);
    }
}

impl<T> Default for RenderState<T> {
    fn default() -> Self {
        Self::Absent
    }
}

/// The state behind a bound view: the render state, the node rendered from
/// it and the bookkeeping needed to notify whoever draws the node.
#[derive(Debug)]
pub(crate) struct RenderCell<T, V> {
    state: RenderState<T>,

    /// The node rendered from `state`, or the placeholder.
    node: V,

    /// The number of renders so far.
    ///
    /// Starts at 0 for the placeholder and is incremented by 1 each time the
    /// node is rendered again.
    version: u64,

    /// Set once the source stream completed. The last node stays in place.
    finished: bool,

    /// Wakers of tasks waiting for the next render.
    wakers: Slab<Waker>,
}

impl<T, V> RenderCell<T, V> {
    pub(crate) fn new(placeholder: V) -> Self {
        Self {
            state: RenderState::Absent,
            node: placeholder,
            version: 0,
            finished: false,
            wakers: Slab::new(),
        }
    }

    pub(crate) fn state(&self) -> &RenderState<T> {
        &self.state
    }

    pub(crate) fn node(&self) -> &V {
        &self.node
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move to `Present(value)` and render the new node.
    ///
    /// Nothing changes if `render` panics.
    pub(crate) fn transition(&mut self, value: T, render: &dyn Fn(&T) -> V) {
        let node = render(&value);
        self.state.transition(value);
        self.node = node;
        self.incr_version_and_wake();
    }

    /// Render the node again from the current value, if there is one.
    ///
    /// While the state is absent, the placeholder stays in place and nobody
    /// is notified.
    pub(crate) fn rerender(&mut self, render: &dyn Fn(&T) -> V) {
        if let Some(value) = self.state.get() {
            self.node = render(value);
            self.incr_version_and_wake();
        }
    }

    /// Record that no further values will arrive.
    pub(crate) fn finish(&mut self) {
        self.finished = true;
        // Clear the backing buffer for the wakers, no new ones will be added.
        wake(mem::take(&mut self.wakers).into_iter().map(|(_, waker)| waker));
    }

    pub(crate) fn poll_changed(
        &mut self,
        observed_version: &mut u64,
        waker_key: &mut Option<usize>,
        cx: &Context<'_>,
    ) -> Poll<Option<()>> {
        if *observed_version < self.version {
            *waker_key = None;
            *observed_version = self.version;
            Poll::Ready(Some(()))
        } else if self.finished {
            *waker_key = None;
            Poll::Ready(None)
        } else {
            // Wakers are only drained together with a version bump or on
            // finish, both handled above, so a stored key is still ours.
            match waker_key.and_then(|key| self.wakers.get_mut(key)) {
                Some(waker) => waker.clone_from(cx.waker()),
                None => *waker_key = Some(self.wakers.insert(cx.waker().clone())),
            }
            Poll::Pending
        }
    }

    pub(crate) fn drop_waker(&mut self, observed_version: u64, waker_key: usize) {
        if !self.finished && self.version == observed_version {
            let _res = self.wakers.try_remove(waker_key);
            debug_assert!(_res.is_some());
        }
    }

    fn incr_version_and_wake(&mut self) {
        self.version += 1;
        wake(self.wakers.drain());
    }
}

fn wake<I>(wakers: I)
where
    I: IntoIterator<Item = Waker>,
    I::IntoIter: ExactSizeIterator,
{
    let iter = wakers.into_iter();
    #[cfg(feature = "tracing")]
    {
        let num_wakers = iter.len();
        if num_wakers > 0 {
            tracing::debug!(
                target: "reactive_view::binder",
                "Waking up {num_wakers} waiting renderers"
            );
        }
    }
    for waker in iter {
        waker.wake();
    }
}
