use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use futures_util::{stream, StreamExt};
use reactive_view::{bind, bind_to, MulticastExt, Placeholder, RenderState, UiThread, ViewBinding};

use crate::{channel, count, counted, settle, text, Node};

/// A render callback that records the values it was called with.
fn recording(log: &Rc<RefCell<Vec<i32>>>) -> impl Fn(&i32) -> Node + 'static {
    let log = Rc::clone(log);
    move |value| {
        log.borrow_mut().push(*value);
        text(value)
    }
}

#[tokio::test]
async fn placeholder_until_first_value() {
    UiThread::new()
        .run_until(async {
            let (_tx, source) = channel::<i32>();
            let view = bind(source, text);

            settle().await;
            assert_eq!(*view.body(), Node::placeholder());
            assert_eq!(view.state(), RenderState::Absent);
            assert_eq!(view.version(), 0);

            // Tearing down a view that never rendered anything.
            let handle = view.handle().clone();
            assert_eq!(handle.consumer_count(), 1);
            drop(view);
            assert_eq!(handle.consumer_count(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn renders_every_value_in_order() {
    UiThread::new()
        .run_until(async {
            let source = stream::iter([1, 2, 3]).then(|value| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                value
            });

            let log = Rc::new(RefCell::new(Vec::new()));
            let mut view = bind(source, recording(&log));

            let mut frames = vec![view.body().clone()];
            while view.changed().await.is_some() {
                frames.push(view.body().clone());
            }

            assert_eq!(
                frames,
                [
                    Node::placeholder(),
                    Node::Text("1".to_owned()),
                    Node::Text("2".to_owned()),
                    Node::Text("3".to_owned()),
                ]
            );
            assert_eq!(*log.borrow(), [1, 2, 3]);
        })
        .await;
}

#[tokio::test]
async fn no_values_skipped_without_gaps() {
    UiThread::new()
        .run_until(async {
            let log = Rc::new(RefCell::new(Vec::new()));
            let mut view = bind(stream::iter(0..50), recording(&log));

            while view.changed().await.is_some() {}
            assert_eq!(*log.borrow(), (0..50).collect::<Vec<_>>());
            assert_eq!(view.version(), 50);
        })
        .await;
}

#[tokio::test]
async fn completion_keeps_last_node() {
    UiThread::new()
        .run_until(async {
            let mut view = bind(stream::iter([1, 2]), text);

            assert_eq!(view.changed().await, Some(()));
            while view.changed().await.is_some() {}
            // Stays that way.
            assert_eq!(view.changed().await, None);

            assert!(view.is_finished());
            assert_eq!(view.state(), RenderState::Present(2));
            assert_eq!(*view.body(), Node::Text("2".to_owned()));
        })
        .await;
}

#[tokio::test]
async fn empty_stream_keeps_placeholder() {
    UiThread::new()
        .run_until(async {
            let mut view = bind(stream::empty::<i32>(), text);

            assert_eq!(view.changed().await, None);
            assert!(view.is_finished());
            assert!(!view.is_present());
            assert_eq!(*view.body(), Node::placeholder());
        })
        .await;
}

#[tokio::test]
async fn two_views_share_one_subscription() {
    UiThread::new()
        .run_until(async {
            let counter = Arc::new(AtomicUsize::new(0));
            let handle = counted(&counter, stream::iter([42])).multicast();

            let log1 = Rc::new(RefCell::new(Vec::new()));
            let log2 = Rc::new(RefCell::new(Vec::new()));
            let mut view1 = bind_to(&handle, recording(&log1));
            let mut view2 = bind_to(&handle, recording(&log2));

            assert_eq!(view1.changed().await, Some(()));
            assert_eq!(view2.changed().await, Some(()));
            assert_eq!(view1.changed().await, None);
            assert_eq!(view2.changed().await, None);

            assert_eq!(*log1.borrow(), [42]);
            assert_eq!(*log2.borrow(), [42]);
            assert_eq!(*view1.body(), Node::Text("42".to_owned()));
            assert_eq!(*view2.body(), Node::Text("42".to_owned()));
            assert_eq!(count(&counter), 1);
            assert_eq!(handle.subscription_count(), 1);
        })
        .await;
}

#[tokio::test]
async fn reconcile_keeps_subscription() {
    UiThread::new()
        .run_until(async {
            let counter = Arc::new(AtomicUsize::new(0));
            let (tx, source) = channel();
            let mut view = ViewBinding::new(counted(&counter, source), text).mount();

            tx.send(1).unwrap();
            view.changed().await;
            assert_eq!(count(&counter), 1);

            // The parent renders again and describes the same view anew.
            for _ in 0..3 {
                let (_unused_tx, fresh_source) = channel::<i32>();
                view.reconcile(ViewBinding::new(counted(&counter, fresh_source), |value: &i32| {
                    Node::Stack(vec![text(value)])
                }));
            }
            assert_eq!(*view.body(), Node::Stack(vec![Node::Text("1".to_owned())]));
            // Re-rendering with the new callback counts as a change.
            assert_eq!(view.changed().await, Some(()));

            tx.send(2).unwrap();
            view.changed().await;
            assert_eq!(*view.body(), Node::Stack(vec![Node::Text("2".to_owned())]));

            settle().await;
            assert_eq!(count(&counter), 1);
            assert_eq!(view.handle().subscription_count(), 1);
        })
        .await;
}

#[tokio::test]
async fn reconcile_before_first_value_keeps_placeholder() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel();
            let mut view = bind(source, text);

            view.reconcile(ViewBinding::new(stream::pending(), |value: &i32| {
                Node::Text(format!("#{value}"))
            }));
            assert_eq!(*view.body(), Node::placeholder());
            assert_eq!(view.version(), 0);

            tx.send(5).unwrap();
            view.changed().await;
            assert_eq!(*view.body(), Node::Text("#5".to_owned()));
        })
        .await;
}

#[tokio::test]
async fn dropped_view_stops_rendering() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel();
            let log = Rc::new(RefCell::new(Vec::new()));
            let mut view = bind(source, recording(&log));

            tx.send(1).unwrap();
            view.changed().await;

            let handle = view.handle().clone();
            let mut other = handle.subscribe();
            drop(view);
            assert_eq!(handle.consumer_count(), 1);

            tx.send(2).unwrap();
            tx.send(3).unwrap();
            assert_eq!(other.next().await, Some(2));
            assert_eq!(other.next().await, Some(3));
            settle().await;

            assert_eq!(*log.borrow(), [1]);
        })
        .await;
}

#[tokio::test]
async fn drop_with_values_in_flight() {
    UiThread::new()
        .run_until(async {
            let log = Rc::new(RefCell::new(Vec::new()));
            let view = bind(stream::iter(0..1000), recording(&log));

            // Let the producer queue up values, then drop before they're applied.
            tokio::task::yield_now().await;
            drop(view);

            let rendered = log.borrow().len();
            settle().await;
            assert_eq!(log.borrow().len(), rendered);
        })
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[cfg_attr(miri, ignore)]
async fn values_from_other_threads_render_on_ui_thread() {
    let ui = UiThread::new();
    let ui_thread = ui.id();

    ui.run_until(async move {
        let (tx, source) = channel();
        let threads = Rc::new(RefCell::new(Vec::new()));
        let mut view = bind(source, {
            let threads = Rc::clone(&threads);
            move |value: &i32| {
                threads.borrow_mut().push(thread::current().id());
                text(value)
            }
        });

        let producer = thread::spawn(move || {
            for i in 1..=20 {
                tx.send(i).unwrap();
                thread::sleep(Duration::from_millis(1));
            }
        });

        while view.state() != RenderState::Present(20) {
            view.changed().await;
        }
        producer.join().unwrap();

        assert!(!threads.borrow().is_empty());
        assert!(threads.borrow().iter().all(|id| *id == ui_thread));
    })
    .await;
}

#[tokio::test]
async fn replayed_value_renders_first_and_once() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel();
            let handle = source.multicast_replay_last();
            let mut early = handle.subscribe();
            tx.send(1).unwrap();
            assert_eq!(early.next().await, Some(1));

            let log = Rc::new(RefCell::new(Vec::new()));
            let mut view = bind_to(&handle, recording(&log));
            assert_eq!(view.changed().await, Some(()));
            assert_eq!(*view.body(), text(&1));

            tx.send(2).unwrap();
            assert_eq!(early.next().await, Some(2));
            view.changed().await;
            settle().await;

            assert_eq!(*view.body(), text(&2));
            assert_eq!(*log.borrow(), [1, 2]);
        })
        .await;
}

#[tokio::test]
async fn panicking_render_finishes_view() {
    UiThread::new()
        .run_until(async {
            let mut view = bind(stream::iter([1, 2, 3]), |value: &i32| {
                assert_ne!(*value, 2, "can't render 2");
                text(value)
            });

            while view.changed().await.is_some() {}
            assert!(view.is_finished());
            assert_eq!(view.state(), RenderState::Present(1));
            assert_eq!(*view.body(), text(&1));
        })
        .await;
}

#[tokio::test]
#[allow(clippy::await_holding_refcell_ref)]
async fn renders_once_body_is_released() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel();
            let mut view = bind(source, text);

            let body = view.body();
            tx.send(1).unwrap();
            settle().await;
            assert_eq!(*body, Node::placeholder());
            drop(body);

            assert_eq!(view.changed().await, Some(()));
            assert_eq!(*view.body(), text(&1));
        })
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[cfg_attr(miri, ignore)]
async fn teardown_does_not_wait_for_slow_consumer() {
    UiThread::new()
        .run_until(async {
            let (tx, source) = channel();
            let handle = source.multicast();

            // Attached first, so it is called first.
            let started = Arc::new(AtomicBool::new(false));
            let _slow = handle.attach({
                let started = Arc::clone(&started);
                move |_: i32| {
                    started.store(true, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(500));
                }
            });
            let view = bind_to(&handle, text);

            tx.send(1).unwrap();
            while !started.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }

            let start = Instant::now();
            drop(view);
            assert!(start.elapsed() < Duration::from_millis(250));
            assert_eq!(handle.consumer_count(), 1);
        })
        .await;
}
