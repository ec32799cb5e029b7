//! # Worker: the queue's single execution context.
//!
//! Drains the submission channel strictly in order and runs one record at a time.
//!
//! ## Flow
//! ```text
//! Running:
//!   loop {
//!     ├─► select (biased): queue token cancelled → Draining
//!     │                    next record          → handle(record)
//!     │                    channel closed       → Terminated
//!     ├─► token cancelled after dequeue → cancel(record), Draining
//!     ├─► record token cancelled        → TaskDiscarded, resolve Canceled
//!     ├─► run body                      → TaskResumed / TaskFinished / TaskFailed
//!     └─► token cancelled after body    → Draining
//!   }
//!
//! Draining:
//!   close receiver (late submissions are cancelled by the Submitter)
//!   while let Some(record) = recv() → TaskCanceled, resolve Canceled
//!
//! Terminated:
//!   publish QueueTerminated
//! ```
//!
//! ## Rules
//! - Cancellation is checked **before and after** each record, never mid-body
//! - A failing or panicking body never stops the loop
//! - Every dequeued record is executed, skipped or cancelled: exactly once

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::state::{QueueState, StateCell};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Outcome, Record};

/// Consumer side of a queue: owns the receiver until it terminates.
pub(crate) struct Worker {
    rx: mpsc::UnboundedReceiver<Record>,
    token: CancellationToken,
    state: Arc<StateCell>,
    bus: Bus,
    queue: Option<Arc<str>>,
}

impl Worker {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Record>,
        token: CancellationToken,
        state: Arc<StateCell>,
        bus: Bus,
        queue: Option<Arc<str>>,
    ) -> Self {
        Self {
            rx,
            token,
            state,
            bus,
            queue,
        }
    }

    /// Runs until the queue is closed and drained, or every submitter is gone.
    pub(crate) async fn run(mut self) {
        loop {
            let record = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(record) => record,
                    None => break,
                },
            };

            if self.token.is_cancelled() {
                self.cancel(record);
                break;
            }
            self.handle(record).await;
            if self.token.is_cancelled() {
                break;
            }
        }

        if self.token.is_cancelled() {
            self.drain().await;
        }
        self.state.set(QueueState::Terminated);
        self.publish(EventKind::QueueTerminated);
    }

    async fn handle(&self, record: Record) {
        let trace = record.trace(&self.bus, self.queue.as_ref());
        trace.emit(EventKind::TaskReceived);

        if record.is_cancelled() {
            trace.emit(EventKind::TaskDiscarded);
            record.job.cancel();
            return;
        }

        trace.emit(EventKind::TaskStarting);
        match record.job.execute(trace.clone()).await {
            Outcome::Resumed => trace.emit(EventKind::TaskResumed),
            Outcome::Finished => trace.emit(EventKind::TaskFinished),
            Outcome::Failed(reason) => trace.emit_failed(reason),
        }
    }

    fn cancel(&self, record: Record) {
        record
            .trace(&self.bus, self.queue.as_ref())
            .emit(EventKind::TaskCanceled);
        record.job.cancel();
    }

    async fn drain(&mut self) {
        self.state.set(QueueState::Draining);
        self.publish(EventKind::QueueDraining);

        self.rx.close();
        while let Some(record) = self.rx.recv().await {
            self.cancel(record);
        }
    }

    fn publish(&self, kind: EventKind) {
        self.bus
            .publish(Event::new(kind).with_queue_opt(self.queue.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Submitter;
    use crate::tasks::{awaiting, Job};
    use std::convert::Infallible;
    use std::sync::Mutex;

    fn spawn_worker() -> (Submitter, CancellationToken, Arc<StateCell>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let state = Arc::new(StateCell::new());
        let worker = Worker::new(rx, token.clone(), state.clone(), bus.clone(), None);
        (Submitter::new(tx, None, bus), token, state, tokio::spawn(worker.run()))
    }

    #[tokio::test]
    async fn test_runs_records_in_order_then_terminates_when_submitters_drop() {
        let (submitter, _token, state, join) = spawn_worker();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let log = log.clone();
            submitter.submit(
                None,
                CancellationToken::new(),
                Job::detached(move || async move {
                    log.lock().unwrap().push(i);
                    Ok::<_, Infallible>(())
                }),
            );
        }
        drop(submitter);
        join.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(state.get(), QueueState::Terminated);
    }

    #[tokio::test]
    async fn test_cancel_drains_queued_records() {
        let (submitter, token, state, join) = spawn_worker();
        token.cancel();

        let rec_token = CancellationToken::new();
        let (job, handle) = awaiting(|| async { Ok::<_, String>(7) }, rec_token.clone(), None);
        submitter.submit(None, rec_token, job);

        assert!(handle.await.unwrap_err().is_canceled());
        join.await.unwrap();
        assert_eq!(state.get(), QueueState::Terminated);
    }
}
