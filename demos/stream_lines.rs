//! # Example: stream_lines
//!
//! Streaming submissions with the built-in [`LogWriter`] subscriber.
//!
//! Demonstrates how to:
//! - Produce many values from one task with [`SerialQueue::dispatch_stream`].
//! - Consume them as a `futures::Stream` of `Result<T, TaskError<E>>`.
//! - See that a stream holds the worker until it completes, and that a stream
//!   ending in error yields the error as its last item.
//! - Follow the lifecycle in the `LogWriter` output.
//!
//! ## Run
//! ```bash
//! cargo run --example stream_lines --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serialq::{LogWriter, QueueConfig, SerialQueue, StreamSink};

const TEXT: &str = "first line\nsecond line\nthird line";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let queue = SerialQueue::builder(QueueConfig::labeled("lines"))
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    // 1. A stream that ends cleanly.
    let mut lines = queue
        .labeled("split")
        .dispatch_stream(|sink: StreamSink<String>| async move {
            for line in TEXT.lines() {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if !sink.send(line.to_owned()) {
                    break;
                }
            }
            Ok::<_, String>(())
        });

    // Submitted after the stream's first poll, so it waits for the whole stream.
    let first = lines.next().await.transpose()?;
    println!("[main] got {first:?}");
    let after = queue
        .labeled("after")
        .dispatch_await(|| async { Ok::<_, String>("ran after the stream") });

    while let Some(line) = lines.next().await {
        println!("[main] got {:?}", line?);
    }
    println!("[main] {}", after.await?);

    // 2. A stream that fails after two values.
    let mut numbers = queue
        .labeled("numbers")
        .dispatch_stream(|sink: StreamSink<u32>| async move {
            sink.send(1);
            sink.send(2);
            Err::<(), _>("sensor disconnected")
        });
    while let Some(item) = numbers.next().await {
        match item {
            Ok(n) => println!("[main] number {n}"),
            Err(e) => println!("[main] stream ended with: {e}"),
        }
    }

    queue.shutdown().await?;
    Ok(())
}
