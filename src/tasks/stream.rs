//! # Streaming submissions: sink and consumer stream.
//!
//! `dispatch_stream(op)` hands the caller a [`TaskStream`] right away. Nothing is
//! enqueued until the stream is first polled. When the worker reaches the record it
//! calls `op(sink)`; every [`StreamSink::send`] is forwarded, in order, to the
//! consumer, and the operation's return value becomes the terminal frame.
//!
//! ```text
//!   TaskStream::poll_next (first) ──► Submitter::submit(record)
//!                                          │
//!   worker: op(StreamSink) ── send(v) ──► [frames] ──► Some(Ok(v))
//!           Ok(())         ── End(Ok) ──►          ──► None
//!           Err(e)         ── End(Err)──►          ──► Some(Err(Failed(e))), None
//!           (no End frame, channel gone)           ──► Some(Err(Canceled)), None
//! ```

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::Submitter;
use crate::error::TaskError;
use crate::events::EventKind;
use crate::tasks::record::{settle, Job, Outcome, Resolve, Trace};

/// One message on a streaming task's channel.
enum Frame<T, E> {
    Item(T),
    End(Result<(), TaskError<E>>),
}

/// Type-erased push side, so the sink does not carry the operation's error type.
trait Push<T>: Send + Sync {
    fn push(&self, value: T) -> bool;
    fn is_closed(&self) -> bool;
}

impl<T, E> Push<T> for mpsc::UnboundedSender<Frame<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn push(&self, value: T) -> bool {
        self.send(Frame::Item(value)).is_ok()
    }

    fn is_closed(&self) -> bool {
        mpsc::UnboundedSender::is_closed(self)
    }
}

/// Write end handed to a streaming operation.
///
/// Values are delivered to the consumer in the order they are sent. Completion and
/// failure are signalled by the operation's return value, not through the sink.
pub struct StreamSink<T> {
    tx: Box<dyn Push<T>>,
    trace: Trace,
}

impl<T> StreamSink<T> {
    /// Pushes one value to the consumer.
    ///
    /// Returns `false` if the consumer has dropped its stream; the value is discarded.
    pub fn send(&self, value: T) -> bool {
        let delivered = self.tx.push(value);
        if delivered {
            self.trace.emit(EventKind::StreamYielded);
        }
        delivered
    }

    /// True once the consumer dropped its stream; the operation may stop early.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct StreamJob<F, T, E> {
    op: F,
    tx: mpsc::UnboundedSender<Frame<T, E>>,
}

impl<F, Fut, T, E> Resolve for StreamJob<F, T, E>
where
    F: FnOnce(StreamSink<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    fn execute(self: Box<Self>, trace: Trace) -> BoxFuture<'static, Outcome> {
        let StreamJob { op, tx } = *self;
        let sink = StreamSink {
            tx: Box::new(tx.clone()),
            trace,
        };
        async move {
            let (end, outcome) = match settle(async move { op(sink).await }).await {
                Ok(Ok(())) => (Ok(()), Outcome::Finished),
                Ok(Err((e, reason))) => (Err(TaskError::Failed(e)), Outcome::Failed(reason)),
                Err(info) => {
                    let reason = format!("panicked: {info}");
                    (Err(TaskError::Panicked { info }), Outcome::Failed(reason))
                }
            };
            let _ = tx.send(Frame::End(end));
            outcome
        }
        .boxed()
    }

    fn cancel(self: Box<Self>) {
        let _ = self.tx.send(Frame::End(Err(TaskError::Canceled)));
    }
}

/// Not-yet-enqueued half of a [`TaskStream`].
struct Pending {
    submitter: Submitter,
    label: Option<Arc<str>>,
    job: Job,
}

/// Builds a lazy stream whose record is enqueued through `submitter` on first poll.
pub(crate) fn streaming<F, Fut, T, E>(
    op: F,
    submitter: Submitter,
    label: Option<Arc<str>>,
) -> TaskStream<T, E>
where
    F: FnOnce(StreamSink<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    TaskStream {
        rx,
        pending: Some(Pending {
            submitter,
            label,
            job: Job::Streaming(Box::new(StreamJob { op, tx })),
        }),
        done: false,
        _guard: token.clone().drop_guard(),
        token,
    }
}

/// Consumer side of a `dispatch_stream` submission.
///
/// A lazy, single-pass stream of `Result<T, TaskError<E>>`: the task is enqueued
/// on the first poll, every item is `Ok` except possibly the last, and the stream
/// ends after the first error.
#[must_use = "streams do nothing unless polled"]
pub struct TaskStream<T, E> {
    rx: mpsc::UnboundedReceiver<Frame<T, E>>,
    pending: Option<Pending>,
    done: bool,
    token: CancellationToken,
    _guard: DropGuard,
}

impl<T, E> Unpin for TaskStream<T, E> {}

impl<T, E> TaskStream<T, E> {
    /// Cancels this submission.
    ///
    /// The next poll yields [`TaskError::Canceled`] and ends the stream. If the worker
    /// has not reached the task yet, its body never runs.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the stream was submitted to its queue (first poll).
    pub fn is_submitted(&self) -> bool {
        self.pending.is_none()
    }
}

impl<T, E> Stream for TaskStream<T, E> {
    type Item = Result<T, TaskError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.token.is_cancelled() {
            this.done = true;
            this.rx.close();
            return Poll::Ready(Some(Err(TaskError::Canceled)));
        }
        if let Some(Pending {
            submitter,
            label,
            job,
        }) = this.pending.take()
        {
            submitter.submit(label, this.token.clone(), job);
        }

        match this.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Frame::Item(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Frame::End(end))) => {
                this.done = true;
                this.rx.close();
                match end {
                    Ok(()) => Poll::Ready(None),
                    Err(e) => Poll::Ready(Some(Err(e))),
                }
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(Some(Err(TaskError::Canceled)))
            }
        }
    }
}

impl<T, E> std::fmt::Debug for TaskStream<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStream")
            .field("submitted", &self.pending.is_none())
            .field("done", &self.done)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
