//! # Task records moved through the submission channel.
//!
//! A [`Record`] is what the worker dequeues: a per-queue id, an optional
//! diagnostic label, the cancellation flag (a [`CancellationToken`] shared with the
//! submitter) and the [`Job`] itself.
//!
//! [`Job`] is a closed sum over the three submission shapes. The typed halves
//! (the caller's result type, error type and handle) stay behind the [`Resolve`]
//! seam, so the channel itself carries no generics.
//!
//! ## Rules
//! - `execute` and `cancel` both consume the job: a handle is resolved exactly once.
//! - Task bodies run under `catch_unwind`; a panic becomes an [`Outcome::Failed`]
//!   and the worker moves on.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind, TaskKind};

/// What happened when the worker ran a job, for tracing.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// An awaiting caller received its value.
    Resumed,
    /// A detached or streaming body completed without error.
    Finished,
    /// The body returned an error or panicked.
    Failed(String),
}

/// Typed completion side of an awaiting or streaming job.
pub(crate) trait Resolve: Send + 'static {
    /// Runs the operation and resolves the caller's handle with its result.
    ///
    /// `trace` is for events raised while the body runs (a streaming sink's
    /// `StreamYielded`). Awaiting jobs raise none; the worker traces their outcome.
    fn execute(self: Box<Self>, trace: Trace) -> BoxFuture<'static, Outcome>;

    /// Resolves the caller's handle with `TaskError::Canceled` without running anything.
    fn cancel(self: Box<Self>);
}

pub(crate) type DetachedFn = Box<dyn FnOnce() -> BoxFuture<'static, Outcome> + Send>;

/// The three submission shapes.
pub(crate) enum Job {
    Detached(DetachedFn),
    Awaiting(Box<dyn Resolve>),
    Streaming(Box<dyn Resolve>),
}

impl Job {
    /// Wraps a fire-and-forget operation. Its error is only ever traced.
    pub(crate) fn detached<F, Fut, E>(op: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Job::Detached(Box::new(move || {
            async move {
                match settle(async move { op().await }).await {
                    Ok(Ok(())) => Outcome::Finished,
                    Ok(Err((_, reason))) => Outcome::Failed(reason),
                    Err(info) => Outcome::Failed(format!("panicked: {info}")),
                }
            }
            .boxed()
        }))
    }

    pub(crate) fn kind(&self) -> TaskKind {
        match self {
            Job::Detached(_) => TaskKind::Detached,
            Job::Awaiting(_) => TaskKind::Awaiting,
            Job::Streaming(_) => TaskKind::Streaming,
        }
    }

    pub(crate) fn execute(self, trace: Trace) -> BoxFuture<'static, Outcome> {
        match self {
            Job::Detached(run) => run(),
            Job::Awaiting(job) | Job::Streaming(job) => job.execute(trace),
        }
    }

    /// Fire-and-forget jobs have no handle, so there is nothing to resolve.
    pub(crate) fn cancel(self) {
        match self {
            Job::Detached(_) => {}
            Job::Awaiting(job) | Job::Streaming(job) => job.cancel(),
        }
    }
}

/// Unit of work in the submission channel.
pub(crate) struct Record {
    /// Per-queue acceptance number (diagnostics only).
    pub(crate) id: u64,
    pub(crate) label: Option<Arc<str>>,
    /// Set by the submitter side when it no longer wants the result.
    pub(crate) token: CancellationToken,
    pub(crate) job: Job,
}

impl Record {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Event context for this record on the given queue.
    pub(crate) fn trace(&self, bus: &Bus, queue: Option<&Arc<str>>) -> Trace {
        Trace {
            bus: bus.clone(),
            queue: queue.cloned(),
            id: self.id,
            kind: self.job.kind(),
            label: self.label.clone(),
        }
    }
}

/// Publishes lifecycle events tagged with one record's metadata.
#[derive(Clone)]
pub(crate) struct Trace {
    bus: Bus,
    queue: Option<Arc<str>>,
    id: u64,
    kind: TaskKind,
    label: Option<Arc<str>>,
}

impl Trace {
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        let ev = Event::new(kind)
            .with_queue_opt(self.queue.as_ref())
            .with_task(self.id, self.kind);
        match &self.label {
            Some(label) => ev.with_label(Arc::clone(label)),
            None => ev,
        }
    }

    pub(crate) fn emit(&self, kind: EventKind) {
        self.bus.publish(self.event(kind));
    }

    pub(crate) fn emit_failed(&self, reason: String) {
        self.bus
            .publish(self.event(EventKind::TaskFailed).with_reason(reason));
    }
}

/// Polls `fut` to completion, turning a panic into its message.
pub(crate) async fn guarded<Fut: Future>(fut: Fut) -> Result<Fut::Output, String> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

/// Like [`guarded`], for an operation's result: the error's reason is rendered
/// inside the guard, so a panicking `Display` counts as a panicking body.
pub(crate) async fn settle<Fut, T, E>(fut: Fut) -> Result<Result<T, (E, String)>, String>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    guarded(async move {
        fut.await.map_err(|e| {
            let reason = e.to_string();
            (e, reason)
        })
    })
    .await
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn trace() -> Trace {
        Trace {
            bus: Bus::new(4),
            queue: Some(Arc::from("q")),
            id: 9,
            kind: TaskKind::Detached,
            label: Some(Arc::from("job")),
        }
    }

    #[tokio::test]
    async fn test_detached_outcomes() {
        let ok = Job::detached(|| async { Ok::<_, Infallible>(()) });
        assert_eq!(ok.kind(), TaskKind::Detached);
        assert_eq!(ok.execute(trace()).await, Outcome::Finished);

        let failed = Job::detached(|| async { Err::<(), _>("no route") });
        assert_eq!(
            failed.execute(trace()).await,
            Outcome::Failed("no route".into())
        );
    }

    #[tokio::test]
    async fn test_detached_panic_is_contained() {
        let job = Job::detached(|| async {
            if true {
                panic!("kaboom");
            }
            Ok::<_, Infallible>(())
        });
        assert_eq!(
            job.execute(trace()).await,
            Outcome::Failed("panicked: kaboom".into())
        );
    }

    struct BadDisplay;

    impl std::fmt::Display for BadDisplay {
        fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            panic!("display exploded")
        }
    }

    #[tokio::test]
    async fn test_panicking_error_display_is_contained() {
        let job = Job::detached(|| async { Err::<(), _>(BadDisplay) });
        assert_eq!(
            job.execute(trace()).await,
            Outcome::Failed("panicked: display exploded".into())
        );
    }

    #[test]
    fn test_trace_event_carries_record_metadata() {
        let ev = trace().event(EventKind::TaskStarting);
        assert_eq!(ev.queue.as_deref(), Some("q"));
        assert_eq!(ev.task_id, Some(9));
        assert_eq!(ev.task_kind, Some(TaskKind::Detached));
        assert_eq!(ev.label.as_deref(), Some("job"));
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
