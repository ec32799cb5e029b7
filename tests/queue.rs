use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serialq::{QueueConfig, QueueState, RuntimeError, SerialQueue, TaskError};
use tokio::sync::oneshot;

/// Occupies the worker until `release` fires; `started` fires once it is running.
fn block_worker(queue: &SerialQueue) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    queue.dispatch(move || async move {
        let _ = started_tx.send(());
        let _ = release_rx.await;
        Ok::<_, Infallible>(())
    });
    (started_rx, release_tx)
}

/// Waits for everything queued so far, then shuts down.
async fn drain_then_shutdown(queue: &SerialQueue) {
    queue
        .dispatch_await(|| async { Ok::<_, Infallible>(()) })
        .await
        .unwrap();
    queue.shutdown().await.unwrap();
}

#[tokio::test]
async fn fire_and_forget_runs_in_submission_order() {
    let queue = SerialQueue::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let log = log.clone();
        queue.dispatch(move || async move {
            tokio::task::yield_now().await;
            log.lock().unwrap().push(i);
            Ok::<_, Infallible>(())
        });
    }
    drain_then_shutdown(&queue).await;

    assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_keep_relative_order() {
    let queue = Arc::new(SerialQueue::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let ticket = Arc::new(Mutex::new(0_usize));

    let mut callers = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        let log = log.clone();
        let ticket = ticket.clone();
        callers.push(tokio::spawn(async move {
            for _ in 0..25 {
                // Taking a ticket and submitting is one step, so ticket order is submission order.
                let mut next = ticket.lock().unwrap();
                let i = *next;
                *next += 1;
                let log = log.clone();
                queue.dispatch(move || async move {
                    log.lock().unwrap().push(i);
                    Ok::<_, Infallible>(())
                });
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }
    drain_then_shutdown(&queue).await;

    assert_eq!(*log.lock().unwrap(), (0..200).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn task_bodies_never_overlap() {
    let queue = Arc::new(SerialQueue::new());
    let running = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));

    let mut waiters = Vec::new();
    for i in 0..20_u64 {
        let queue = queue.clone();
        let running = running.clone();
        let overlapped = overlapped.clone();
        waiters.push(tokio::spawn(async move {
            queue
                .dispatch_await(move || async move {
                    if running.swap(true, Ordering::SeqCst) {
                        overlapped.store(true, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    running.store(false, Ordering::SeqCst);
                    Ok::<_, Infallible>(i)
                })
                .await
        }));
    }

    for (i, waiter) in waiters.into_iter().enumerate() {
        assert_eq!(waiter.await.unwrap().unwrap(), i as u64);
    }
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn awaiting_returns_value_or_error_verbatim() {
    #[derive(Debug, PartialEq)]
    struct Denied(&'static str);
    impl std::fmt::Display for Denied {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "denied: {}", self.0)
        }
    }

    let queue = SerialQueue::new();

    let ok = queue.dispatch_await(|| async { Ok::<_, Denied>("v") }).await;
    assert_eq!(ok.unwrap(), "v");

    let err = queue
        .dispatch_await(|| async { Err::<&str, _>(Denied("e")) })
        .await;
    match err {
        Err(TaskError::Failed(e)) => assert_eq!(e, Denied("e")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn close_drains_queued_tasks_without_running_them() {
    let queue = SerialQueue::new();
    let ran = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let ran = ran.clone();
            queue.dispatch_await(move || async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            })
        })
        .collect();
    queue.close();

    for handle in handles {
        assert!(handle.await.unwrap_err().is_canceled());
    }
    queue.shutdown().await.unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(queue.state(), QueueState::Terminated);
}

#[tokio::test]
async fn close_lets_in_flight_body_finish_then_drains() {
    let queue = SerialQueue::new();
    let (started, release) = block_worker(&queue);
    let next = queue.dispatch_await(|| async { Ok::<_, Infallible>(1) });
    started.await.unwrap();

    let behind = Arc::new(AtomicBool::new(false));
    let flag = behind.clone();
    let queued = queue.dispatch_await(move || async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<_, Infallible>(2)
    });

    queue.close();
    assert!(queue.is_closed());
    release.send(()).unwrap();

    assert!(next.await.unwrap_err().is_canceled());
    assert!(queued.await.unwrap_err().is_canceled());
    queue.shutdown().await.unwrap();
    assert!(!behind.load(Ordering::SeqCst));
}

#[tokio::test]
async fn close_is_idempotent() {
    let queue = SerialQueue::with_label("twice");
    queue.close();
    queue.close();
    queue.shutdown().await.unwrap();
    queue.shutdown().await.unwrap();
    queue.close();

    assert_eq!(queue.state(), QueueState::Terminated);
    assert_eq!(queue.label(), Some("twice"));
}

#[tokio::test]
async fn submission_after_close_is_cancelled() {
    let queue = SerialQueue::new();
    queue.shutdown().await.unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let late = queue.dispatch_await(move || async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<_, Infallible>(())
    });
    assert!(late.await.unwrap_err().is_canceled());
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancelled_wait_resolves_immediately_and_body_is_skipped() {
    let queue = SerialQueue::new();
    let (started, release) = block_worker(&queue);
    started.await.unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let handle = queue.dispatch_await(move || async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<_, Infallible>(())
    });
    handle.cancel();

    // Resolves while the worker is still blocked.
    assert!(handle.await.unwrap_err().is_canceled());

    release.send(()).unwrap();
    queue
        .dispatch_await(|| async { Ok::<_, Infallible>(()) })
        .await
        .unwrap();
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_token_unblocks_waiter_from_another_task() {
    let queue = SerialQueue::new();
    let (started, release) = block_worker(&queue);
    started.await.unwrap();

    let handle = queue.dispatch_await(|| async { Ok::<_, Infallible>(()) });
    let token = handle.cancellation_token();
    let waiter = tokio::spawn(handle);
    tokio::task::yield_now().await;
    token.cancel();

    assert!(waiter.await.unwrap().unwrap_err().is_canceled());
    drop(release);
}

#[tokio::test]
async fn dropped_handle_skips_body() {
    let queue = SerialQueue::new();
    let (started, release) = block_worker(&queue);
    started.await.unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    drop(queue.dispatch_await(move || async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<_, Infallible>(())
    }));

    release.send(()).unwrap();
    drain_then_shutdown(&queue).await;
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn panicking_body_does_not_stop_the_worker() {
    let queue = SerialQueue::new();

    let boom = queue
        .dispatch_await(|| async {
            if true {
                panic!("index out of range");
            }
            Ok::<u8, Infallible>(0)
        })
        .await;
    match boom {
        Err(TaskError::Panicked { info }) => assert_eq!(info, "index out of range"),
        other => panic!("unexpected result: {other:?}"),
    }

    queue.dispatch(|| async { Err::<(), _>("nobody is listening") });
    let next = queue.dispatch_await(|| async { Ok::<_, Infallible>(7) }).await;
    assert_eq!(next.unwrap(), 7);
    assert_eq!(queue.state(), QueueState::Running);
}

#[tokio::test]
async fn dropping_queue_finishes_queued_work() {
    let (tx, rx) = oneshot::channel();
    {
        let queue = SerialQueue::new();
        queue.dispatch(move || async move {
            let _ = tx.send("done");
            Ok::<_, Infallible>(())
        });
    }
    assert_eq!(rx.await.unwrap(), "done");
}

#[tokio::test]
async fn shutdown_aborts_worker_after_grace() {
    let cfg = QueueConfig {
        grace: Duration::from_millis(20),
        ..QueueConfig::labeled("stuck")
    };
    let queue = SerialQueue::builder(cfg).build();
    let (started_tx, started_rx) = oneshot::channel();
    let stuck = queue.dispatch_await(move || async move {
        let _ = started_tx.send(());
        std::future::pending::<()>().await;
        Ok::<_, Infallible>(())
    });
    started_rx.await.unwrap();

    match queue.shutdown().await {
        Err(RuntimeError::GraceExceeded { grace, label }) => {
            assert_eq!(grace, Duration::from_millis(20));
            assert_eq!(label.as_deref(), Some("stuck"));
        }
        other => panic!("unexpected shutdown result: {other:?}"),
    }
    assert!(stuck.await.unwrap_err().is_canceled());
    assert_eq!(queue.state(), QueueState::Terminated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_shutdowns_both_wait_for_termination() {
    let queue = Arc::new(SerialQueue::new());
    let (started, release) = block_worker(&queue);
    started.await.unwrap();

    let first = tokio::spawn({
        let queue = queue.clone();
        async move { queue.shutdown().await }
    });
    while !queue.is_closed() {
        tokio::task::yield_now().await;
    }
    let second = tokio::spawn({
        let queue = queue.clone();
        async move {
            let res = queue.shutdown().await;
            (res, queue.state())
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished());
    assert_eq!(queue.state(), QueueState::Running);

    release.send(()).unwrap();
    let (res, state) = second.await.unwrap();
    res.unwrap();
    assert_eq!(state, QueueState::Terminated);
    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn labeled_handle_carries_label() {
    let queue = SerialQueue::new();
    let handle = queue
        .labeled("load-user")
        .dispatch_await(|| async { Ok::<_, Infallible>(5) });
    assert_eq!(handle.label(), Some("load-user"));
    assert_eq!(handle.await.unwrap(), 5);
}

