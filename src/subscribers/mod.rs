//! # Event subscribers for the serial queue.
//!
//! This module provides the [`Subscribe`] trait, the `SubscriberSet` fan-out,
//! and (with the `logging` feature) a built-in printer.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Worker ── publish(Event) ──► Bus ──► spawn_listener ──► SubscriberSet
//!                                                               │
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 LogWriter  Metrics   Custom
//! ```
//!
//! Subscribers are purely observational: a queue built without any runs the
//! same control flow, it just has nobody listening on the bus.

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
