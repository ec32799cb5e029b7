//! # Task records and caller-facing handles.
//!
//! This module provides the task-related types:
//! - `Record` / `Job` - the unit moved through the submission channel (crate-private)
//! - [`TaskHandle`] - awaitable one-shot result of an awaiting submission
//! - [`TaskStream`] / [`StreamSink`] - consumer and producer ends of a streaming submission

mod handle;
mod record;
mod stream;

pub use handle::TaskHandle;
pub use stream::{StreamSink, TaskStream};

pub(crate) use handle::awaiting;
pub(crate) use record::{panic_message, Job, Outcome, Record};
pub(crate) use stream::streaming;
