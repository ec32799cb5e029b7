//! # serialq
//!
//! **serialq** is a serial task queue for tokio.
//!
//! Many callers submit async work concurrently; a single dedicated worker runs it
//! one item at a time, strictly in the order it was accepted. Use it to serialize
//! access to a stateful resource (a connection, a file, a device) without locks
//! held across `.await`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   caller A   │   │   caller B   │   │   caller C   │
//!     │  dispatch()  │   │dispatch_await│   │dispatch_strm │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SerialQueue                                                      │
//! │  - Submitter (unbounded mpsc, FIFO, never blocks)                 │
//! │  - CancellationToken (close)                                      │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                 ┌───────────────────────────────┐
//!                 │  Worker (one tokio task)      │──► Bus ──► SubscriberSet
//!                 │  Running → Draining → Term.   │
//!                 └──┬──────────────┬─────────────┘
//!                    ▼              ▼
//!               TaskHandle      TaskStream
//!              (one value)    (many values)
//! ```
//!
//! ### Lifecycle of one record
//! ```text
//! submit ──► channel ──► worker dequeues
//!                          ├─ queue closed?        → resolve Canceled (TaskCanceled)
//!                          ├─ record cancelled?    → skip body       (TaskDiscarded)
//!                          └─ run body
//!                               ├─ Ok   → TaskResumed / TaskFinished
//!                               ├─ Err  → error to caller           (TaskFailed)
//!                               └─ panic→ TaskError::Panicked       (TaskFailed)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                           |
//! |-------------------|---------------------------------------------------------------|----------------------------------------------|
//! | **Queue**         | Submit fire-and-forget, awaiting and streaming work.          | [`SerialQueue`], [`Labeled`]                 |
//! | **Handles**       | Await one result or consume a stream of results.              | [`TaskHandle`], [`TaskStream`], [`StreamSink`] |
//! | **Shutdown**      | Close, drain with cancellation, bounded wait.                 | [`QueueState`], [`RuntimeError`]             |
//! | **Subscriber API**| Observe lifecycle events (logging, metrics, custom).          | [`Subscribe`], [`Event`], [`EventKind`]      |
//! | **Errors**        | Typed per-submission and runtime errors.                      | [`TaskError`], [`RuntimeError`]              |
//! | **Configuration** | Label, bus capacity, shutdown grace.                          | [`QueueConfig`], [`QueueBuilder`]            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use serialq::{QueueConfig, SerialQueue, StreamSink};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = SerialQueue::builder(QueueConfig::labeled("example")).build();
//!
//!     // Awaiting: one value back.
//!     let sum = queue.dispatch_await(|| async { Ok::<_, String>(1 + 2) }).await?;
//!     assert_eq!(sum, 3);
//!
//!     // Streaming: many values, then completion.
//!     let mut lines = queue.dispatch_stream(|sink: StreamSink<&'static str>| async move {
//!         sink.send("alpha");
//!         sink.send("beta");
//!         Ok::<_, String>(())
//!     });
//!     while let Some(line) = lines.next().await {
//!         println!("{}", line?);
//!     }
//!
//!     queue.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{Labeled, QueueBuilder, QueueConfig, QueueState, SerialQueue};
pub use error::{RuntimeError, TaskError};
pub use events::{Event, EventKind, TaskKind};
pub use subscribers::Subscribe;
pub use tasks::{StreamSink, TaskHandle, TaskStream};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
