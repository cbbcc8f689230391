//! Event vocabulary for worker activity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Observable worker activity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    /// The worker process came up and entered its polling loop
    WorkerStarted { worker: String },

    /// A job is about to be handed to the immediate-execution system.
    ///
    /// Emitted after the job is popped from the delay store and before
    /// the dispatch call. Observers cannot veto or mutate the dispatch.
    BeforeDispatch {
        queue: String,
        task: String,
        args: Vec<Value>,
        due: DateTime<Utc>,
    },

    /// The polling loop observed the shutdown flag and exited
    WorkerStopped { worker: String },
}

impl DispatchEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::WorkerStarted { .. } => "WorkerStarted",
            DispatchEvent::BeforeDispatch { .. } => "BeforeDispatch",
            DispatchEvent::WorkerStopped { .. } => "WorkerStopped",
        }
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    /// The event
    pub event: DispatchEvent,
}

impl EventLogEntry {
    /// Create a new log entry with the current timestamp
    pub fn new(event: DispatchEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
