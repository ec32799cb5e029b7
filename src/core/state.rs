//! # Worker lifecycle state.
//!
//! ```text
//! Running ──close()──► Draining ──channel empty──► Terminated
//!    └──────────── all submitters dropped ────────────┘
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a queue's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Executing records in order.
    Running,
    /// Close requested; remaining records are resolved as cancelled, none executed.
    Draining,
    /// Worker exited.
    Terminated,
}

impl QueueState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => QueueState::Running,
            1 => QueueState::Draining,
            _ => QueueState::Terminated,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            QueueState::Running => 0,
            QueueState::Draining => 1,
            QueueState::Terminated => 2,
        }
    }
}

/// Shared cell the worker writes and the queue reads.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(QueueState::Running.as_u8()))
    }

    pub(crate) fn get(&self) -> QueueState {
        QueueState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: QueueState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}
