//! # Submission channel (producer side).
//!
//! [`Submitter`] wraps the unbounded sender every producer shares. `submit` never
//! blocks and never rejects: once the worker has torn the channel down, a record is
//! accepted and immediately resolved as cancelled instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, EventKind};
use crate::tasks::{Job, Record};

/// Cloneable sending half of a queue's submission channel.
#[derive(Clone)]
pub(crate) struct Submitter {
    tx: mpsc::UnboundedSender<Record>,
    next_id: Arc<AtomicU64>,
    queue: Option<Arc<str>>,
    bus: Bus,
}

impl Submitter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Record>, queue: Option<Arc<str>>, bus: Bus) -> Self {
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(0)),
            queue,
            bus,
        }
    }

    /// Enqueues a record and returns its id.
    pub(crate) fn submit(&self, label: Option<Arc<str>>, token: CancellationToken, job: Job) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Record {
            id,
            label,
            token,
            job,
        };

        if let Err(mpsc::error::SendError(record)) = self.tx.send(record) {
            record
                .trace(&self.bus, self.queue.as_ref())
                .emit(EventKind::TaskCanceled);
            record.job.cancel();
        }
        id
    }
}
