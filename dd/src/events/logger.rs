//! Event logger - persists bus events to a JSONL file
//!
//! Subscribes to the [`EventBus`] and appends every event to
//! `events.jsonl` in the configured directory, one timestamped JSON
//! object per line, for history and debugging.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{DispatchEvent, EventLogEntry};

/// Writes dispatch events to an append-only JSONL file
pub struct EventLogger {
    log_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl EventLogger {
    /// Create a logger writing to `events.jsonl` under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            log_path: dir.as_ref().join("events.jsonl"),
            writer: None,
        }
    }

    /// Append one event, opening the log file on first use
    pub fn write_event(&mut self, event: &DispatchEvent) -> Result<()> {
        if self.writer.is_none() {
            if let Some(parent) = self.log_path.parent() {
                fs::create_dir_all(parent).context("Failed to create event log directory")?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
                .context("Failed to open event log")?;
            debug!(path = ?self.log_path, "opened event log");
            self.writer = Some(BufWriter::new(file));
        }

        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Run the logger, consuming bus events until the bus is dropped.
    ///
    /// Meant to be spawned as a background task.
    pub async fn run(mut self, bus: Arc<EventBus>) {
        let mut rx = bus.subscribe();
        drop(bus);

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(error = %e, "failed to write event log entry");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event logger lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("event bus closed, stopping event logger");
                    break;
                }
            }
        }

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScheduledJob, WorkerIdentity};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_events_are_written_as_jsonl() {
        let dir = TempDir::new().unwrap();
        let mut logger = EventLogger::new(dir.path());

        logger
            .write_event(&DispatchEvent::WorkerStarted {
                worker: WorkerIdentity::new("host", 1).to_string(),
            })
            .unwrap();
        logger
            .write_event(&DispatchEvent::BeforeDispatch {
                queue: "emails".to_string(),
                task: "Send".to_string(),
                args: vec![],
                due: Utc::now(),
            })
            .unwrap();

        let contents = fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: EventLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event.event_type(), "WorkerStarted");
        let second: EventLogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.event.event_type(), "BeforeDispatch");
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut logger = EventLogger::new(&nested);

        logger
            .write_event(&DispatchEvent::WorkerStopped {
                worker: "host:2:schedule".to_string(),
            })
            .unwrap();

        assert!(nested.join("events.jsonl").exists());
    }

    #[tokio::test]
    async fn test_run_consumes_bus_events_until_close() {
        let dir = TempDir::new().unwrap();
        let logger = EventLogger::new(dir.path());
        let bus = Arc::new(EventBus::new(16));

        let handle = tokio::spawn(logger.run(bus.clone()));

        // Let the spawned logger subscribe to the bus before we emit,
        // otherwise the broadcast event is sent to zero receivers and lost.
        tokio::task::yield_now().await;

        let job = ScheduledJob::new("emails", "Send", vec![]);
        bus.before_dispatch(&job, Utc::now());

        // Dropping the bus closes the channel and stops the logger
        drop(bus);
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("logger should stop when the bus closes")
            .unwrap();

        let contents = fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
