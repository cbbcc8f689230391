//! Polling loop and drain engine
//!
//! The poller repeatedly drains every due job from the delay store into
//! the dispatch sink, then sleeps for the configured interval. A drain
//! pass walks due timestamps in order and fully empties each one before
//! querying the next, so dispatch order is FIFO by due time within one
//! worker. Shutdown is cooperative: the flag is read at iteration
//! boundaries only, and an in-flight drain always completes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eyre::Result;
use tracing::{debug, info};

use super::shutdown::Shutdown;
use super::status::{Phase, StatusLine};
use crate::domain::{Horizon, WorkerIdentity};
use crate::events::EventBus;
use crate::store::{DelayStore, DispatchSink};

/// Default poll interval between drain cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// The delayed-job worker: drain engine plus polling loop
pub struct Poller {
    store: Arc<dyn DelayStore>,
    sink: Arc<dyn DispatchSink>,
    events: Arc<EventBus>,
    identity: WorkerIdentity,
    interval: Duration,
    shutdown: Shutdown,
    status: StatusLine,
}

impl Poller {
    /// Create a worker polling `store` every `interval` and handing due
    /// jobs to `sink`
    pub fn new(
        store: Arc<dyn DelayStore>,
        sink: Arc<dyn DispatchSink>,
        events: Arc<EventBus>,
        identity: WorkerIdentity,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            events,
            identity,
            interval,
            shutdown: Shutdown::new(),
            status: StatusLine::new(),
        }
    }

    /// Handle for requesting cooperative shutdown
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Handle for observing the worker's phase string
    pub fn status_line(&self) -> StatusLine {
        self.status.clone()
    }

    /// This worker's identity string
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Run the polling loop until shutdown is requested.
    ///
    /// Blocks the calling task. Store and dispatch failures propagate
    /// out uncaught; process supervision is expected to restart the
    /// worker.
    pub async fn run(&self) -> Result<()> {
        self.status.set(Phase::Starting);
        info!(
            worker = %self.identity,
            interval_ms = self.interval.as_millis() as u64,
            "delayed-job worker starting"
        );

        let installed = self.shutdown.install_signals();
        debug!(signals_installed = installed, "signal handling configured");

        self.events.worker_started(&self.identity);

        loop {
            if self.shutdown.is_requested() {
                break;
            }

            self.status.set(Phase::ProcessingDelayedItems);
            let dispatched = self.drain_due(Horizon::Now).await?;
            if dispatched > 0 {
                debug!(dispatched, "drain cycle complete");
            }

            // Skip the final sleep when shutdown arrived mid-drain
            if self.shutdown.is_requested() {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        self.events.worker_stopped(&self.identity);
        info!(worker = %self.identity, "delayed-job worker stopped");
        Ok(())
    }

    /// Drain every job due at or before `horizon`, one timestamp at a
    /// time. Returns the number of jobs dispatched.
    ///
    /// All jobs for an earlier due timestamp are dispatched before any
    /// later timestamp is queried. With [`Horizon::Now`] the bound is
    /// re-resolved by the store on every query, so timestamps that
    /// became due while the drain was running are included in the same
    /// pass.
    pub async fn drain_due(&self, horizon: Horizon) -> Result<u64> {
        let mut dispatched = 0u64;
        while let Some(ts) = self.store.next_due_timestamp(horizon).await? {
            dispatched += self.drain_timestamp(ts).await?;
        }
        Ok(dispatched)
    }

    /// Dispatch every job stored at exactly `ts`, in pop order
    async fn drain_timestamp(&self, ts: DateTime<Utc>) -> Result<u64> {
        let mut dispatched = 0u64;
        while let Some(job) = self.store.pop_job(ts).await? {
            info!(
                task = %job.task,
                queue = %job.queue,
                args = %job.args_json(),
                due = %ts.to_rfc3339(),
                "queueing delayed job"
            );

            self.events.before_dispatch(&job, ts);
            self.sink.dispatch(&job.queue, &job.task, &job.args).await?;
            dispatched += 1;
        }
        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use serde_json::{Value, json};

    use crate::domain::ScheduledJob;
    use crate::events::DispatchEvent;
    use crate::store::{
        DispatchError, DispatchSink, MemoryDelayStore, MemoryDispatchSink, StoreError,
    };

    fn poller(store: Arc<MemoryDelayStore>, sink: Arc<MemoryDispatchSink>) -> Poller {
        Poller::new(
            store,
            sink,
            Arc::new(EventBus::new(64)),
            WorkerIdentity::new("test-host", 1),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_empty_store_means_no_dispatches_and_no_events() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        let poller = poller(store, sink.clone());
        let mut events = poller.events.subscribe();

        let dispatched = poller.drain_due(Horizon::Now).await.unwrap();

        assert_eq!(dispatched, 0);
        assert!(sink.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_earlier_timestamps_drain_before_later_ones() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        let now = Utc::now();

        // Interleave insertion order across two due times
        store.enqueue_at(now - ChronoDuration::seconds(10), ScheduledJob::new("q", "Late1", vec![]));
        store.enqueue_at(now - ChronoDuration::seconds(60), ScheduledJob::new("q", "Early1", vec![]));
        store.enqueue_at(now - ChronoDuration::seconds(10), ScheduledJob::new("q", "Late2", vec![]));
        store.enqueue_at(now - ChronoDuration::seconds(60), ScheduledJob::new("q", "Early2", vec![]));

        let poller = poller(store.clone(), sink.clone());
        let dispatched = poller.drain_due(Horizon::Now).await.unwrap();

        assert_eq!(dispatched, 4);
        let tasks: Vec<String> = sink.dispatched().into_iter().map(|job| job.task).collect();
        assert_eq!(tasks, vec!["Early1", "Early2", "Late1", "Late2"]);
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn test_two_jobs_at_one_timestamp_dispatch_in_pop_order() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        let due = Utc::now() - ChronoDuration::seconds(30);

        store.enqueue_at(due, ScheduledJob::new("emails", "Send", vec![json!("x")]));
        store.enqueue_at(due, ScheduledJob::new("emails", "Send", vec![json!("y")]));

        let poller = poller(store.clone(), sink.clone());
        let dispatched = poller.drain_due(Horizon::Now).await.unwrap();

        assert_eq!(dispatched, 2);
        let jobs = sink.dispatched();
        assert_eq!(jobs[0].queue, "emails");
        assert_eq!(jobs[0].task, "Send");
        assert_eq!(jobs[0].args, vec![json!("x")]);
        assert_eq!(jobs[1].args, vec![json!("y")]);

        // The timestamp is exhausted, not revisited
        assert_eq!(store.pop_job(due).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_future_jobs_stay_in_the_store() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        store.enqueue_at(
            Utc::now() + ChronoDuration::seconds(10),
            ScheduledJob::new("emails", "Send", vec![]),
        );

        let poller = poller(store.clone(), sink.clone());
        let dispatched = poller.drain_due(Horizon::Now).await.unwrap();

        assert_eq!(dispatched, 0);
        assert!(sink.is_empty());
        assert_eq!(store.pending(), 1);
    }

    #[tokio::test]
    async fn test_before_dispatch_event_precedes_each_job() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        let due = Utc::now() - ChronoDuration::seconds(5);
        store.enqueue_at(due, ScheduledJob::new("emails", "Send", vec![json!("x")]));
        store.enqueue_at(due, ScheduledJob::new("emails", "Send", vec![json!("y")]));

        let poller = poller(store, sink);
        let mut events = poller.events.subscribe();
        poller.drain_due(Horizon::Now).await.unwrap();

        for expected in ["x", "y"] {
            match events.try_recv().unwrap() {
                DispatchEvent::BeforeDispatch { args, .. } => {
                    assert_eq!(args, vec![json!(expected)]);
                }
                other => panic!("Expected BeforeDispatch, got {}", other.event_type()),
            }
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_exits_immediately_when_shutdown_precedes_the_loop() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        store.enqueue_at(
            Utc::now() - ChronoDuration::seconds(5),
            ScheduledJob::new("emails", "Send", vec![]),
        );

        let poller = Arc::new(poller(store.clone(), sink.clone()));
        poller.shutdown_handle().request();

        tokio::time::timeout(Duration::from_secs(5), poller.run())
            .await
            .expect("run should return promptly")
            .unwrap();

        // The flag was observed at the top of the loop, before any drain
        assert!(sink.is_empty());
        assert_eq!(store.pending(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl DelayStore for FailingStore {
        async fn next_due_timestamp(&self, _horizon: Horizon) -> Result<Option<DateTime<Utc>>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn pop_job(&self, _ts: DateTime<Utc>) -> Result<Option<ScheduledJob>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_propagate_uncaught() {
        let poller = Poller::new(
            Arc::new(FailingStore),
            Arc::new(MemoryDispatchSink::new()),
            Arc::new(EventBus::new(16)),
            WorkerIdentity::new("test-host", 1),
            Duration::from_millis(100),
        );

        let err = poller.drain_due(Horizon::Now).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    struct RejectingSink;

    #[async_trait]
    impl DispatchSink for RejectingSink {
        async fn dispatch(&self, _queue: &str, _task: &str, _args: &[Value]) -> Result<(), DispatchError> {
            Err(DispatchError::Rejected("queue is gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_propagates_and_the_popped_job_is_lost() {
        let store = Arc::new(MemoryDelayStore::new());
        store.enqueue_at(
            Utc::now() - ChronoDuration::seconds(5),
            ScheduledJob::new("emails", "Send", vec![]),
        );

        let poller = Poller::new(
            store.clone(),
            Arc::new(RejectingSink),
            Arc::new(EventBus::new(16)),
            WorkerIdentity::new("test-host", 1),
            Duration::from_millis(100),
        );

        let err = poller.drain_due(Horizon::Now).await.unwrap_err();
        assert!(err.to_string().contains("queue is gone"));

        // The job was popped before the failure; no recovery is attempted
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn test_status_reflects_the_processing_phase() {
        let store = Arc::new(MemoryDelayStore::new());
        let sink = Arc::new(MemoryDispatchSink::new());
        let poller = Arc::new(poller(store, sink));
        let status = poller.status_line();
        let shutdown = poller.shutdown_handle();

        let worker = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.run().await })
        };

        // Wait for the first cycle to stamp the phase
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while status.current() != Phase::ProcessingDelayedItems.to_string() {
            assert!(tokio::time::Instant::now() < deadline, "phase never recorded");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.request();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker should stop after shutdown")
            .unwrap()
            .unwrap();
    }
}
