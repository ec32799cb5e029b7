//! Queue events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the worker, the submitters
//! and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`TaskKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: worker loop, `Submitter` (accepted-then-cancelled records),
//!   `SerialQueue::close`, `SubscriberSet` workers (overflow/panic).
//! - **Consumer**: the queue's event listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, TaskKind};
