//! Bind async streams to declarative views.
//!
//! This crate connects a push-based data source, any [`Stream`] of values,
//! to a node of a declarative UI tree that is re-rendered on every emission.
//! It consists of two parts:
//!
//! - [`StreamMulticaster`] wraps a stream into a [`MulticastHandle`], which
//!   subscribes to the stream at most once and fans every value out to all
//!   attached consumers. Consumers attaching late only see future values,
//!   unless [`Replay::Last`] is requested explicitly.
//! - [`bind`] creates a [`BoundView`] from a stream and a render callback. The
//!   view holds a [`RenderState`], renders a [`Placeholder`] until the first
//!   value arrives, and calls the render callback with every new value, always
//!   on the UI thread (see [`UiThread`]).
//!
//! [`reactive_view`], [`StreamViewExt::view`] and the [`ReactiveBuilder`]
//! trait are different spellings of [`bind`].
//!
//! Streams are failure-free: their items are plain values. A collaborator
//! that can fail (a network fetch, say) has to turn failures into substitute
//! values before handing its stream to this crate.
//!
//! ```
//! use futures_util::stream;
//! use reactive_view::{bind, Placeholder, UiThread};
//!
//! #[derive(Debug, PartialEq)]
//! enum Node {
//!     Stack,
//!     Text(String),
//! }
//!
//! impl Placeholder for Node {
//!     fn placeholder() -> Self {
//!         Node::Stack
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! UiThread::new()
//!     .run_until(async {
//!         let mut view = bind(stream::iter(["A", "B"]), |s: &&str| Node::Text(s.to_string()));
//!         // Nothing was emitted yet.
//!         assert_eq!(*view.body(), Node::Stack);
//!
//!         // Wait for renders until the stream completes.
//!         while view.changed().await.is_some() {}
//!         assert_eq!(*view.body(), Node::Text("B".to_owned()));
//!     })
//!     .await;
//! # }
//! ```
//!
//! Cargo features:
//!
//! - `tracing`: Emit [tracing] events when consumers attach and detach, values
//!   are broadcast and views are rendered
//!
//! [`Stream`]: futures_core::Stream
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms, unreachable_pub)]

mod binder;
pub mod builder;
pub mod multicast;
mod read_guard;
mod state;
mod ui;

#[doc(inline)]
pub use self::{
    binder::{bind, bind_to, BoundView, Changed, Placeholder, ViewBinding},
    builder::{reactive_view, ReactiveBuilder, StreamViewExt},
    multicast::{
        MulticastExt, MulticastHandle, MulticastStream, Replay, StreamMulticaster, Subscription,
    },
    read_guard::BodyGuard,
    state::RenderState,
    ui::UiThread,
};
