//! # Lifecycle events emitted by the serial queue.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Task lifecycle**: what the worker did with one record (received, started, resumed, ...)
//! - **Queue lifecycle**: close requested, draining, terminated
//! - **Subscriber events**: overflow and panics inside observers
//!
//! The [`Event`] struct carries metadata such as the queue label, task label,
//! task id and failure reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use serialq::{Event, EventKind, TaskKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_queue("db")
//!     .with_task(7, TaskKind::Awaiting)
//!     .with_label("load-user")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task_id, Some(7));
//! assert_eq!(ev.label.as_deref(), Some("load-user"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `label`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `label`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Task lifecycle events ===
    /// Worker dequeued a record.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    TaskReceived,

    /// Worker is about to run the record's body.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    TaskStarting,

    /// Awaiting task delivered its value to the caller.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    TaskResumed,

    /// Streaming task pushed one value into its sink.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    StreamYielded,

    /// Fire-and-forget or streaming task finished without error.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    TaskFinished,

    /// Task body returned an error or panicked.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`, `reason`
    TaskFailed,

    /// Record was skipped because its submitter cancelled it before it started.
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    TaskDiscarded,

    /// Record was resolved with a cancellation error without running
    /// (queue closed while it was queued, or submitted after close).
    ///
    /// Sets: `queue`, `task_id`, `task_kind`, `label`
    TaskCanceled,

    // === Queue lifecycle events ===
    /// `close()` was called for the first time.
    ///
    /// Sets: `queue`
    CloseRequested,

    /// Worker stopped executing and is resolving the remaining records.
    ///
    /// Sets: `queue`
    QueueDraining,

    /// Worker exited.
    ///
    /// Sets: `queue`
    QueueTerminated,
}

/// Which submission shape a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// `dispatch`: no caller-visible handle.
    Detached,
    /// `dispatch_await`: one value or error.
    Awaiting,
    /// `dispatch_stream`: many values then completion or failure.
    Streaming,
}

impl TaskKind {
    /// Short stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Detached => "detached",
            TaskKind::Awaiting => "awaiting",
            TaskKind::Streaming => "streaming",
        }
    }
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Label of the queue that emitted the event, if it has one.
    pub queue: Option<Arc<str>>,
    /// Per-queue acceptance number of the record.
    pub task_id: Option<u64>,
    /// Submission shape of the record.
    pub task_kind: Option<TaskKind>,
    /// Diagnostic label of the record (or subscriber name for subscriber events).
    pub label: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            queue: None,
            task_id: None,
            task_kind: None,
            label: None,
            reason: None,
        }
    }

    /// Attaches the queue label.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches the queue label if there is one.
    #[inline]
    pub fn with_queue_opt(mut self, queue: Option<&Arc<str>>) -> Self {
        self.queue = queue.cloned();
        self
    }

    /// Attaches the record id and its submission shape.
    #[inline]
    pub fn with_task(mut self, id: u64, kind: TaskKind) -> Self {
        self.task_id = Some(id);
        self.task_kind = Some(kind);
        self
    }

    /// Attaches a record (or subscriber) label.
    #[inline]
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_label(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_label(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
