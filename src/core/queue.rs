//! # SerialQueue: accept work from anywhere, run it one at a time, in order.
//!
//! The [`SerialQueue`] owns the submission channel's producer side, the worker's
//! cancellation token and join handle, and the event bus.
//!
//! ## High-level architecture
//! ```text
//! callers (many)                                   worker (one)
//!   dispatch(op)        ──┐
//!   dispatch_await(op)  ──┼──► Submitter ──► [unbounded channel] ──► Worker::run()
//!   dispatch_stream(op) ──┘   (record)          (FIFO)                 │
//!        │                                                             ├─► op().await
//!        ├─ TaskHandle  ◄──────────── oneshot ◄────────────────────────┤
//!        └─ TaskStream  ◄──────────── frames  ◄────────────────────────┘
//!
//! close()    ──► token.cancel() ──► worker drains: every queued record → Canceled
//! shutdown() ──► close() + wait up to cfg.grace for Terminated (abort after)
//! ```
//!
//! ## Example
//! ```rust
//! use serialq::{SerialQueue, TaskError};
//! use std::convert::Infallible;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let queue = SerialQueue::with_label("db");
//!
//!     queue.dispatch(|| async {
//!         // runs first
//!         Ok::<_, Infallible>(())
//!     });
//!
//!     let answer = queue
//!         .dispatch_await(|| async { Ok::<_, String>(40 + 2) })
//!         .await;
//!     assert_eq!(answer.unwrap(), 42);
//!
//!     queue.close();
//!     let late = queue.dispatch_await(|| async { Ok::<_, String>(0) }).await;
//!     assert!(matches!(late, Err(TaskError::Canceled)));
//! }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    builder::QueueBuilder,
    config::QueueConfig,
    state::{QueueState, StateCell},
    submit::Submitter,
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    tasks::{awaiting, panic_message, streaming, Job, StreamSink, TaskHandle, TaskStream},
};

/// Serial task queue with a single dedicated worker.
///
/// Cheap to share behind an `Arc`; every method takes `&self`. Dropping the last
/// reference (and every pending [`TaskStream`]) lets the worker run out the records
/// already queued and then terminate.
pub struct SerialQueue {
    cfg: QueueConfig,
    label: Option<Arc<str>>,
    submitter: Submitter,
    bus: Bus,
    token: CancellationToken,
    closed: AtomicBool,
    state: Arc<StateCell>,
    worker: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SerialQueue {
    /// Unnamed queue with default configuration and no observers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        QueueBuilder::new(QueueConfig::default()).build()
    }

    /// Queue whose events carry `label`.
    pub fn with_label(label: impl Into<String>) -> Self {
        QueueBuilder::new(QueueConfig::labeled(label)).build()
    }

    /// Starts a builder from an explicit configuration.
    pub fn builder(cfg: QueueConfig) -> QueueBuilder {
        QueueBuilder::new(cfg)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        cfg: QueueConfig,
        label: Option<Arc<str>>,
        submitter: Submitter,
        bus: Bus,
        token: CancellationToken,
        state: Arc<StateCell>,
        worker: Mutex<Option<JoinHandle<()>>>,
        listener: Mutex<Option<JoinHandle<()>>>,
    ) -> Self {
        Self {
            cfg,
            label,
            submitter,
            bus,
            token,
            closed: AtomicBool::new(false),
            state,
            worker,
            listener,
        }
    }

    /// Fire-and-forget submission; returns immediately.
    ///
    /// An error returned by `op` is never surfaced to the caller, only to subscribers
    /// as a `TaskFailed` event.
    pub fn dispatch<F, Fut, E>(&self, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.submit_detached(None, op);
    }

    /// Awaiting submission: the returned handle resolves with `op`'s value or error.
    ///
    /// The record is enqueued immediately, so submission order is the call order even
    /// if handles are awaited later or out of order.
    pub fn dispatch_await<F, Fut, T, E>(&self, op: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.submit_awaiting(None, op)
    }

    /// Streaming submission: returns a lazy stream, enqueued on its first poll.
    pub fn dispatch_stream<F, Fut, T, E>(&self, op: F) -> TaskStream<T, E>
    where
        F: FnOnce(StreamSink<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        streaming(op, self.submitter.clone(), None)
    }

    /// Submission view that tags each record with a diagnostic label.
    ///
    /// ```rust
    /// # use serialq::SerialQueue;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let queue = SerialQueue::new();
    /// let handle = queue.labeled("load-user").dispatch_await(|| async { Ok::<_, String>(1) });
    /// assert_eq!(handle.label(), Some("load-user"));
    /// assert_eq!(handle.await.unwrap(), 1);
    /// # }
    /// ```
    pub fn labeled(&self, label: impl Into<Arc<str>>) -> Labeled<'_> {
        Labeled {
            queue: self,
            label: label.into(),
        }
    }

    /// Requests shutdown. Idempotent, non-blocking, callable from any context.
    ///
    /// A body already running is not interrupted. Every record still queued, and any
    /// record submitted from now on, resolves with [`TaskError::Canceled`](crate::TaskError::Canceled).
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.bus
            .publish(Event::new(EventKind::CloseRequested).with_queue_opt(self.label.as_ref()));
        self.token.cancel();
    }

    /// Closes the queue and waits for the worker to terminate.
    ///
    /// Waits at most [`QueueConfig::grace`]; past that the worker is aborted (its
    /// pending handles resolve as cancelled) and [`RuntimeError::GraceExceeded`] is
    /// returned. A worker that died instead of terminating is reported as
    /// [`RuntimeError::WorkerFailed`]. Subscribers have seen every event up to
    /// `QueueTerminated` once this returns. Concurrent callers all return after
    /// termination; calling it again afterwards is a no-op.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.close();

        // Held across the wait so concurrent callers queue up behind it.
        let mut worker = self.worker.lock().await;
        let mut result = Ok(());
        if let Some(join) = worker.as_mut() {
            let grace = self.cfg.grace;
            match tokio::time::timeout(grace, &mut *join).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.mark_terminated();
                    result = Err(RuntimeError::WorkerFailed {
                        label: self.cfg.label.clone(),
                        info: join_failure(err),
                    });
                }
                Err(_) => {
                    join.abort();
                    let _ = (&mut *join).await;
                    self.mark_terminated();
                    result = Err(RuntimeError::GraceExceeded {
                        grace,
                        label: self.cfg.label.clone(),
                    });
                }
            }
            *worker = None;
        }
        drop(worker);

        let mut listener = self.listener.lock().await;
        if let Some(join) = listener.take() {
            let _ = join.await;
        }
        result
    }

    /// Stands in for the worker's own `Terminated` transition when it never ran it.
    fn mark_terminated(&self) {
        self.state.set(QueueState::Terminated);
        self.bus
            .publish(Event::new(EventKind::QueueTerminated).with_queue_opt(self.label.as_ref()));
    }

    /// Current lifecycle state of the worker.
    pub fn state(&self) -> QueueState {
        self.state.get()
    }

    /// True once [`close`](Self::close) or [`shutdown`](Self::shutdown) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Diagnostic label of the queue.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Configuration the queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.cfg
    }

    fn submit_detached<F, Fut, E>(&self, label: Option<Arc<str>>, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.submitter
            .submit(label, CancellationToken::new(), Job::detached(op));
    }

    fn submit_awaiting<F, Fut, T, E>(&self, label: Option<Arc<str>>, op: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let token = CancellationToken::new();
        let (job, handle) = awaiting(op, token.clone(), label.clone());
        self.submitter.submit(label, token, job);
        handle
    }
}

fn join_failure(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        err.to_string()
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Submission view returned by [`SerialQueue::labeled`].
///
/// Same three entry points as the queue; each record carries the label in its events
/// and on the returned handle.
pub struct Labeled<'a> {
    queue: &'a SerialQueue,
    label: Arc<str>,
}

impl Labeled<'_> {
    /// Labeled [`SerialQueue::dispatch`].
    pub fn dispatch<F, Fut, E>(&self, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.queue
            .submit_detached(Some(Arc::clone(&self.label)), op);
    }

    /// Labeled [`SerialQueue::dispatch_await`].
    pub fn dispatch_await<F, Fut, T, E>(&self, op: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.queue
            .submit_awaiting(Some(Arc::clone(&self.label)), op)
    }

    /// Labeled [`SerialQueue::dispatch_stream`].
    pub fn dispatch_stream<F, Fut, T, E>(&self, op: F) -> TaskStream<T, E>
    where
        F: FnOnce(StreamSink<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        streaming(
            op,
            self.queue.submitter.clone(),
            Some(Arc::clone(&self.label)),
        )
    }
}
