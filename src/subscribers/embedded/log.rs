//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [received] queue="db" task=#3 kind=awaiting label="load-user"
//! [starting] queue="db" task=#3 kind=awaiting label="load-user"
//! [resumed] queue="db" task=#3 kind=awaiting label="load-user"
//! [failed] queue="db" task=#4 kind=detached label="-" err="connection refused"
//! [discarded] queue="db" task=#5 kind=awaiting label="-"
//! [close-requested] queue="db"
//! [draining] queue="db"
//! [canceled] queue="db" task=#6 kind=streaming label="-"
//! [terminated] queue="db"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn task_line(tag: &str, e: &Event) -> String {
    format!(
        "[{tag}] queue={:?} task=#{} kind={} label={:?}",
        e.queue.as_deref().unwrap_or("-"),
        e.task_id.unwrap_or_default(),
        e.task_kind.map(|k| k.as_str()).unwrap_or("-"),
        e.label.as_deref().unwrap_or("-"),
    )
}

fn queue_line(tag: &str, e: &Event) -> String {
    format!("[{tag}] queue={:?}", e.queue.as_deref().unwrap_or("-"))
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskReceived => println!("{}", task_line("received", e)),
            EventKind::TaskStarting => println!("{}", task_line("starting", e)),
            EventKind::TaskResumed => println!("{}", task_line("resumed", e)),
            EventKind::StreamYielded => println!("{}", task_line("yield", e)),
            EventKind::TaskFinished => println!("{}", task_line("finished", e)),
            EventKind::TaskDiscarded => println!("{}", task_line("discarded", e)),
            EventKind::TaskCanceled => println!("{}", task_line("canceled", e)),
            EventKind::TaskFailed => {
                println!(
                    "{} err={:?}",
                    task_line("failed", e),
                    e.reason.as_deref().unwrap_or("-")
                );
            }
            EventKind::CloseRequested => println!("{}", queue_line("close-requested", e)),
            EventKind::QueueDraining => println!("{}", queue_line("draining", e)),
            EventKind::QueueTerminated => println!("{}", queue_line("terminated", e)),
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    e.label, e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={} info={}",
                    e.label.as_deref().unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TaskKind;

    #[test]
    fn test_task_line_formats_metadata() {
        let ev = Event::new(EventKind::TaskStarting)
            .with_queue("db")
            .with_task(3, TaskKind::Awaiting)
            .with_label("load-user");
        assert_eq!(
            task_line("starting", &ev),
            r#"[starting] queue="db" task=#3 kind=awaiting label="load-user""#
        );
    }

    #[test]
    fn test_queue_line_without_label() {
        let ev = Event::new(EventKind::QueueTerminated);
        assert_eq!(queue_line("terminated", &ev), r#"[terminated] queue="-""#);
    }
}
