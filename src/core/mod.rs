//! Queue core: submission, worker loop and lifecycle.
//!
//! The public API from this module is [`SerialQueue`] (with its [`QueueBuilder`],
//! [`QueueConfig`] and [`QueueState`]).
//!
//! Internal modules:
//! - [`submit`]: producer side of the unbounded submission channel;
//! - [`worker`]: the single consumer, `Running → Draining → Terminated`;
//! - [`queue`]: public submission/close API;
//! - [`builder`]: wires bus, subscribers, channel and worker together;
//! - [`state`]: lifecycle state shared between worker and queue.

mod builder;
mod config;
mod queue;
mod state;
mod submit;
mod worker;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use queue::{Labeled, SerialQueue};
pub use state::QueueState;

pub(crate) use submit::Submitter;
