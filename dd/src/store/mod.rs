//! Storage seams: the delayed-job store and the immediate dispatch sink
//!
//! The daemon is written against these traits. The timestamp-ordered
//! storage engine and the immediate-execution queue live outside this
//! process; [`memory`] provides process-local implementations for
//! development and tests.

mod memory;

pub use memory::{DispatchedJob, MemoryDelayStore, MemoryDispatchSink};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Horizon, ScheduledJob};

/// Errors raised by a delay-store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend was unreachable or failed a query/pop
    #[error("delay store error: {0}")]
    Backend(String),
}

/// Errors raised by the immediate-execution system
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The immediate-execution system refused the job
    #[error("dispatch rejected: {0}")]
    Rejected(String),
}

/// Time-ordered store of not-yet-due jobs.
///
/// Due times have second resolution. Implementations must make
/// [`pop_job`](DelayStore::pop_job) atomic under concurrent callers,
/// including callers in other processes: exactly one caller receives
/// any given job. The drain loop depends on that exclusivity but does
/// not provide it.
#[async_trait]
pub trait DelayStore: Send + Sync {
    /// Earliest timestamp at or before `horizon` that still has pending
    /// jobs, or `None` when nothing is due.
    ///
    /// `Horizon::Now` is resolved against the current wall clock on
    /// every call, never cached across calls.
    async fn next_due_timestamp(&self, horizon: Horizon) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Atomically remove and return one job stored at `ts`, or `None`
    /// once the timestamp is exhausted.
    async fn pop_job(&self, ts: DateTime<Utc>) -> Result<Option<ScheduledJob>, StoreError>;
}

/// Hands jobs to the immediate-execution system.
///
/// Delivery is accept-or-fail: a returned error means the job was not
/// taken, and since it has already been popped from the delay store the
/// caller cannot restore it. Durable sinks should acknowledge only
/// after the job is safely queued.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    /// Submit one job for immediate execution
    async fn dispatch(&self, queue: &str, task: &str, args: &[Value]) -> Result<(), DispatchError>;
}
