//! In-memory store and sink for development and tests
//!
//! Jobs are bucketed by unix second in a `BTreeMap`, which keeps due
//! timestamps ordered and makes "earliest at or before the bound" a
//! range scan. Atomicity of `pop_job` holds within this process only;
//! a networked backend is needed for multi-process workers.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use super::{DelayStore, DispatchError, DispatchSink, StoreError};
use crate::domain::{Horizon, ScheduledJob};

/// Process-local [`DelayStore`] backed by a `BTreeMap` keyed on unix
/// seconds.
#[derive(Default)]
pub struct MemoryDelayStore {
    buckets: Mutex<BTreeMap<i64, VecDeque<ScheduledJob>>>,
}

impl MemoryDelayStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a job to become due at `ts`, truncated to whole seconds.
    ///
    /// Jobs at the same second are popped in insertion order.
    pub fn enqueue_at(&self, ts: DateTime<Utc>, job: ScheduledJob) {
        let second = ts.timestamp();
        debug!(due = second, queue = %job.queue, task = %job.task, "storing delayed job");
        let mut buckets = self.buckets.lock().expect("delay store mutex poisoned");
        buckets.entry(second).or_default().push_back(job);
    }

    /// Number of jobs currently stored, across all timestamps
    pub fn pending(&self) -> usize {
        let buckets = self.buckets.lock().expect("delay store mutex poisoned");
        buckets.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl DelayStore for MemoryDelayStore {
    async fn next_due_timestamp(&self, horizon: Horizon) -> Result<Option<DateTime<Utc>>, StoreError> {
        let bound = horizon.resolve(Utc::now()).timestamp();
        let buckets = self.buckets.lock().expect("delay store mutex poisoned");

        let next = buckets
            .range(..=bound)
            .find(|(_, jobs)| !jobs.is_empty())
            .map(|(&second, _)| second);

        Ok(next.and_then(|second| Utc.timestamp_opt(second, 0).single()))
    }

    async fn pop_job(&self, ts: DateTime<Utc>) -> Result<Option<ScheduledJob>, StoreError> {
        let second = ts.timestamp();
        let mut buckets = self.buckets.lock().expect("delay store mutex poisoned");

        let Some(jobs) = buckets.get_mut(&second) else {
            return Ok(None);
        };

        let job = jobs.pop_front();
        if jobs.is_empty() {
            buckets.remove(&second);
        }
        Ok(job)
    }
}

/// A job as received by the [`MemoryDispatchSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedJob {
    pub queue: String,
    pub task: String,
    pub args: Vec<Value>,
}

/// Process-local [`DispatchSink`] that records every submission, in
/// order. Used as the assertion point in tests and as the development
/// sink.
#[derive(Default)]
pub struct MemoryDispatchSink {
    jobs: Mutex<Vec<DispatchedJob>>,
}

impl MemoryDispatchSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far, in submission order
    pub fn dispatched(&self) -> Vec<DispatchedJob> {
        self.jobs.lock().expect("dispatch sink mutex poisoned").clone()
    }

    /// Number of jobs dispatched so far
    pub fn len(&self) -> usize {
        self.jobs.lock().expect("dispatch sink mutex poisoned").len()
    }

    /// True when nothing has been dispatched yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DispatchSink for MemoryDispatchSink {
    async fn dispatch(&self, queue: &str, task: &str, args: &[Value]) -> Result<(), DispatchError> {
        let mut jobs = self.jobs.lock().expect("dispatch sink mutex poisoned");
        jobs.push(DispatchedJob {
            queue: queue.to_string(),
            task: task.to_string(),
            args: args.to_vec(),
        });
        Ok(())
    }
}
