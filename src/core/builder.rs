use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    config::QueueConfig, queue::SerialQueue, state::StateCell, submit::Submitter, worker::Worker,
};
use crate::{
    events::{Bus, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`SerialQueue`] with optional observers.
pub struct QueueBuilder {
    cfg: QueueConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl QueueBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events (received, started, resumed, failed,
    /// discarded, ...) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the queue and starts its worker.
    ///
    /// Must be called from within a tokio runtime. Initializes:
    /// - Event bus (and the subscriber listener, if any subscribers were given)
    /// - Submission channel
    /// - Worker task, in `Running` state
    pub fn build(self) -> SerialQueue {
        let label = self.cfg.label_arc();
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        // Subscribe before the worker exists so no event is missed.
        let listener = (!self.subscribers.is_empty())
            .then(|| spawn_listener(&bus, SubscriberSet::new(self.subscribers, bus.clone())));

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let state = Arc::new(StateCell::new());
        let worker = Worker::new(rx, token.clone(), Arc::clone(&state), bus.clone(), label.clone());
        let worker = tokio::spawn(worker.run());

        SerialQueue::from_parts(
            self.cfg,
            label.clone(),
            Submitter::new(tx, label, bus.clone()),
            bus,
            token,
            state,
            Mutex::new(Some(worker)),
            Mutex::new(listener),
        )
    }
}

/// Forwards bus events to the subscriber set until the worker reports termination.
pub(super) fn spawn_listener(bus: &Bus, set: SubscriberSet) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let last = ev.kind == EventKind::QueueTerminated;
                    set.emit(ev);
                    if last {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    })
}
