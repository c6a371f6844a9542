use std::{
    cell::Ref,
    fmt, ops,
};

/// A read guard for the current node of a [`BoundView`][crate::BoundView].
///
/// Note that as long as a `BodyGuard` is kept alive, the associated view is
/// locked and can not be re-rendered.
#[must_use]
#[clippy::has_significant_drop]
pub struct BodyGuard<'a, V> {
    inner: Ref<'a, V>,
}

impl<'a, V> BodyGuard<'a, V> {
    pub(crate) fn new<B>(owner: Ref<'a, B>, project: impl FnOnce(&B) -> &V) -> Self {
        Self { inner: Ref::map(owner, project) }
    }
}

impl<V: fmt::Debug> fmt::Debug for BodyGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<V> ops::Deref for BodyGuard<'_, V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
