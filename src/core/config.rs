//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the settings a [`SerialQueue`](crate::SerialQueue) is
//! built from.
//!
//! ## Sentinel values
//! - `label = None` → unnamed queue (events carry no queue label)
//! - `bus_capacity = 0` → clamped to 1
//! - `grace = 0s` → `shutdown()` does not wait; a worker still busy is aborted

use std::sync::Arc;
use std::time::Duration;

/// Configuration for one serial queue.
///
/// ## Field semantics
/// - `label`: Diagnostic name attached to every event of this queue
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped)
/// - `grace`: Maximum wait in `shutdown()` for the in-flight task to finish and the
///   worker to drain
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Diagnostic label of the queue.
    pub label: Option<String>,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Maximum time `shutdown()` waits for the worker to terminate.
    ///
    /// Closing never interrupts a task body that is already running; this bounds how
    /// long shutdown waits for it. When exceeded the worker is aborted and every
    /// pending handle resolves as cancelled.
    pub grace: Duration,
}

impl QueueConfig {
    /// Default configuration with a diagnostic label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Label in the shared form events carry.
    pub(crate) fn label_arc(&self) -> Option<Arc<str>> {
        self.label.as_deref().map(Arc::from)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `label = None`
    /// - `bus_capacity = 1024`
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            label: None,
            bus_capacity: 1024,
            grace: Duration::from_secs(60),
        }
    }
}
