//! # Example: serial_counter
//!
//! A shared counter mutated by many concurrent callers through one [`SerialQueue`].
//!
//! Demonstrates how to:
//! - Serialize access to plain state without holding a lock across `.await`.
//! - Mix fire-and-forget ([`SerialQueue::dispatch`]) and awaiting
//!   ([`SerialQueue::dispatch_await`]) submissions.
//! - Observe that a failing task reaches its caller while the queue keeps going.
//! - Shut the queue down and see queued work cancelled.
//!
//! ## Flow
//! ```text
//! 8 callers ──► dispatch(increment) ×10 ──► Worker (one at a time)
//!          └──► dispatch_await(read)     ──► 80
//! dispatch_await(fails)                  ──► Err(Failed("negative"))
//! close() ──► queued increments          ──► Canceled
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example serial_counter
//! ```

use std::sync::Arc;
use std::time::Duration;

use serialq::{QueueConfig, SerialQueue, TaskError};
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. One queue, one piece of state it guards.
    let queue = Arc::new(SerialQueue::builder(QueueConfig::labeled("counter")).build());
    let counter = Arc::new(Mutex::new(0_i64));

    // 2. Many callers submit increments concurrently.
    let mut callers = Vec::new();
    for caller in 0..8 {
        let queue = Arc::clone(&queue);
        let counter = Arc::clone(&counter);
        callers.push(tokio::spawn(async move {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                queue.dispatch(move || async move {
                    let mut value = counter.lock().await;
                    let seen = *value;
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    // No other task can interleave here: the worker runs one body at a time.
                    *value = seen + 1;
                    Ok::<_, std::convert::Infallible>(())
                });
            }
            println!("[caller {caller}] submitted 10 increments");
        }));
    }
    for caller in callers {
        caller.await?;
    }

    // 3. An awaiting read is queued behind every increment.
    let read = Arc::clone(&counter);
    let total = queue
        .dispatch_await(move || async move { Ok::<_, String>(*read.lock().await) })
        .await?;
    println!("[main] counter = {total}");

    // 4. Errors go back to the caller verbatim.
    let check = Arc::clone(&counter);
    let res = queue
        .labeled("guard")
        .dispatch_await(move || async move {
            let value = *check.lock().await;
            if value >= 0 {
                Err::<(), _>(format!("refusing to reset {value}"))
            } else {
                Ok(())
            }
        })
        .await;
    match res {
        Err(TaskError::Failed(reason)) => println!("[main] guard failed: {reason}"),
        other => println!("[main] guard returned {other:?}"),
    }

    // 5. Close with work still queued: it never runs.
    let late: Vec<_> = (0..3)
        .map(|_| {
            let counter = Arc::clone(&counter);
            queue.dispatch_await(move || async move {
                *counter.lock().await += 100;
                Ok::<_, String>(())
            })
        })
        .collect();
    queue.shutdown().await?;

    for handle in late {
        println!("[main] late increment: {:?}", handle.await);
    }
    println!("[main] final counter = {}", *counter.lock().await);
    Ok(())
}
