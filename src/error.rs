//! Error types used by the serial queue and its submissions.
//!
//! This module defines two error enums:
//!
//! - [`TaskError`]: the outcome error of a single awaiting or streaming submission.
//! - [`RuntimeError`]: errors raised by the queue itself (shutdown).
//!
//! Both provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors delivered to the submitter of a task.
///
/// `E` is the error type of the submitted operation; it is carried verbatim in
/// [`TaskError::Failed`].
#[derive(Error, Debug)]
pub enum TaskError<E> {
    /// The task never ran to completion for its caller: the queue was closed while it
    /// was still queued, or the caller cancelled its own wait.
    #[error("task cancelled")]
    Canceled,

    /// The operation itself returned an error.
    #[error("task failed: {0}")]
    Failed(E),

    /// The operation panicked on the worker. The queue keeps running.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl<E> TaskError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use serialq::TaskError;
    ///
    /// let err: TaskError<std::io::Error> = TaskError::Canceled;
    /// assert_eq!(err.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Canceled => "task_canceled",
            TaskError::Failed(_) => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// True for the queue-produced cancellation error.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }

    /// Returns the operation's own error, if that is what this is.
    ///
    /// ```
    /// use serialq::TaskError;
    ///
    /// let err = TaskError::Failed("boom");
    /// assert_eq!(err.into_failure(), Some("boom"));
    /// ```
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// # Errors produced by the queue runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The worker did not terminate within the shutdown grace period and was aborted.
    #[error("shutdown timeout {grace:?} exceeded for queue {label:?}; worker aborted")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Diagnostic label of the queue.
        label: Option<String>,
    },

    /// The worker task ended abnormally (panicked or was cancelled by the runtime).
    #[error("worker of queue {label:?} failed: {info}")]
    WorkerFailed {
        /// Diagnostic label of the queue.
        label: Option<String>,
        /// Panic payload or cancellation note.
        info: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use serialq::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), label: None };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::WorkerFailed { .. } => "runtime_worker_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, label } => {
                format!(
                    "grace exceeded after {grace:?}; queue={}",
                    label.as_deref().unwrap_or("unnamed")
                )
            }
            RuntimeError::WorkerFailed { label, info } => {
                format!(
                    "worker failed: {info}; queue={}",
                    label.as_deref().unwrap_or("unnamed")
                )
            }
        }
    }
}
