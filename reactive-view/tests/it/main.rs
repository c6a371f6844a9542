#![allow(missing_docs)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures_core::Stream;
use futures_util::{stream, StreamExt};
use reactive_view::Placeholder;
use tokio::sync::mpsc;

mod binder;
mod builder;

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Stack(Vec<Node>),
    Text(String),
}

impl Placeholder for Node {
    fn placeholder() -> Self {
        Node::Stack(Vec::new())
    }
}

fn text(value: &i32) -> Node {
    Node::Text(value.to_string())
}

/// A source that only emits what is sent through the returned sender.
fn channel<T: Send + 'static>() -> (mpsc::UnboundedSender<T>, impl Stream<Item = T> + Send) {
    let (tx, rx) = mpsc::unbounded_channel();
    let source = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|v| (v, rx)) });
    (tx, source)
}

/// Wrap `inner` so that subscribing to it increments `counter`.
fn counted<S>(counter: &Arc<AtomicUsize>, inner: S) -> impl Stream<Item = S::Item> + Send
where
    S: Stream + Send,
{
    let counter = Arc::clone(counter);
    stream::once(async move {
        counter.fetch_add(1, Ordering::SeqCst);
        inner
    })
    .flatten()
}

fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Give spawned tasks a chance to run.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
