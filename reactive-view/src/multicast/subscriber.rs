use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::Stream;
use tokio::sync::mpsc;

use super::{MulticastHandle, Subscription};

/// A consumer of a [`MulticastHandle`] in the form of a [`Stream`].
///
/// Created by [`MulticastHandle::subscribe`]. Keeps the handle alive, so the
/// wrapped stream is driven for as long as this stream exists. Dropping it
/// detaches the consumer.
#[derive(Debug)]
pub struct MulticastStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
    _handle: MulticastHandle<T>,
}

impl<T: Clone + Send + 'static> MulticastStream<T> {
    pub(super) fn new(handle: &MulticastHandle<T>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = handle.attach(move |value| {
            // The receiver only goes away together with the subscription.
            let _ = tx.send(value);
        });

        Self { rx, _subscription: subscription, _handle: handle.clone() }
    }
}

impl<T> MulticastStream<T> {
    /// Wait for the next value.
    ///
    /// Returns `None` once the wrapped stream completed and all values
    /// emitted before that were received.
    ///
    /// This method is a convenience so you don't have to import a `Stream`
    /// extension trait such as `futures::StreamExt` or
    /// `tokio_stream::StreamExt`.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Stream for MulticastStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
