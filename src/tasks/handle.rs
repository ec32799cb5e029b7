//! # Result handle for awaiting submissions.
//!
//! [`TaskHandle`] is returned by `dispatch_await`. It is a future that resolves
//! exactly once with the operation's value, its error, or [`TaskError::Canceled`].
//!
//! ## Cancellation
//! ```text
//! handle.cancel()  ──► record token cancelled ──► handle resolves Canceled now
//!                                              └─► worker skips the body if it
//!                                                  has not dequeued it yet
//! drop(handle)     ──► same token cancelled (nobody is waiting any more)
//! worker gone      ──► oneshot sender dropped ──► handle resolves Canceled
//! ```
//! A value that was already delivered wins over a later cancellation.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::record::{settle, Job, Outcome, Resolve, Trace};

type Reply<T, E> = Result<T, TaskError<E>>;

/// Typed awaiting job: the operation plus the sending half of the caller's handle.
struct AwaitJob<F, T, E> {
    op: F,
    tx: oneshot::Sender<Reply<T, E>>,
}

impl<F, Fut, T, E> Resolve for AwaitJob<F, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    fn execute(self: Box<Self>, _trace: Trace) -> BoxFuture<'static, Outcome> {
        let AwaitJob { op, tx } = *self;
        async move {
            let (reply, outcome) = match settle(async move { op().await }).await {
                Ok(Ok(value)) => (Ok(value), Outcome::Resumed),
                Ok(Err((e, reason))) => (Err(TaskError::Failed(e)), Outcome::Failed(reason)),
                Err(info) => {
                    let reason = format!("panicked: {info}");
                    (Err(TaskError::Panicked { info }), Outcome::Failed(reason))
                }
            };
            // The caller may have cancelled while the body ran; the value is dropped then.
            let _ = tx.send(reply);
            outcome
        }
        .boxed()
    }

    fn cancel(self: Box<Self>) {
        let _ = self.tx.send(Err(TaskError::Canceled));
    }
}

/// Builds the awaiting job and the caller's handle, both bound to `token`.
pub(crate) fn awaiting<F, Fut, T, E>(
    op: F,
    token: CancellationToken,
    label: Option<Arc<str>>,
) -> (Job, TaskHandle<T, E>)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let job = Job::Awaiting(Box::new(AwaitJob { op, tx }));
    (job, TaskHandle::new(rx, token, label))
}

/// Awaitable result of a `dispatch_await` submission.
///
/// Resolves to `Ok(value)`, `Err(TaskError::Failed(e))` with the operation's own error,
/// `Err(TaskError::Panicked { .. })`, or `Err(TaskError::Canceled)`.
#[must_use = "dropping a TaskHandle cancels the task if it has not started"]
pub struct TaskHandle<T, E> {
    inner: BoxFuture<'static, Reply<T, E>>,
    token: CancellationToken,
    label: Option<Arc<str>>,
}

impl<T, E> TaskHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn new(rx: oneshot::Receiver<Reply<T, E>>, token: CancellationToken, label: Option<Arc<str>>) -> Self {
        let guard = token.clone().drop_guard();
        let cancelled = token.clone();
        let inner = async move {
            let reply = tokio::select! {
                biased;
                reply = rx => reply.unwrap_or(Err(TaskError::Canceled)),
                _ = cancelled.cancelled() => Err(TaskError::Canceled),
            };
            let _ = guard.disarm();
            reply
        }
        .boxed();

        Self {
            inner,
            token,
            label,
        }
    }
}

impl<T, E> TaskHandle<T, E> {
    /// Cancels this submission.
    ///
    /// The handle resolves with [`TaskError::Canceled`] right away. If the worker has
    /// not dequeued the task yet, its body never runs; a body already running is not
    /// interrupted and its result is discarded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once [`cancel`](Self::cancel) was called (directly or through the token).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token controlling this submission, for cancelling the wait from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Diagnostic label given at submission.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Reply<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T, E> std::fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("label", &self.label)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
