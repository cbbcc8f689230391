//! Event bus - pub/sub for worker activity
//!
//! Built on tokio broadcast channels. Emission never blocks and never
//! fails the emitter: no subscribers is fine, and slow subscribers lag
//! rather than exert backpressure on the drain loop.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use super::types::DispatchEvent;
use crate::domain::{ScheduledJob, WorkerIdentity};

/// Default channel capacity (events). Dispatch events are low-rate, so
/// a modest buffer covers even a briefly stalled subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for worker activity
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers.
    ///
    /// Fire-and-forget: send errors (no subscribers) are ignored.
    pub fn emit(&self, event: DispatchEvent) {
        debug!(event_type = event.event_type(), "emitting event");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    // === Convenience emitters ===

    /// The worker entered its polling loop
    pub fn worker_started(&self, worker: &WorkerIdentity) {
        self.emit(DispatchEvent::WorkerStarted {
            worker: worker.to_string(),
        });
    }

    /// A job is about to be handed to the immediate-execution system
    pub fn before_dispatch(&self, job: &ScheduledJob, due: DateTime<Utc>) {
        self.emit(DispatchEvent::BeforeDispatch {
            queue: job.queue.clone(),
            task: job.task.clone(),
            args: job.args.clone(),
            due,
        });
    }

    /// The polling loop exited
    pub fn worker_stopped(&self, worker: &WorkerIdentity) {
        self.emit(DispatchEvent::WorkerStopped {
            worker: worker.to_string(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
