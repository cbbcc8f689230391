//! delayd - delayed-job dispatch daemon
//!
//! delayd bridges "schedule this job for later" and "this job is now
//! eligible to run": a long-running worker polls a time-ordered store
//! of not-yet-due jobs and moves every job whose due time has passed
//! into an immediate-execution queue.
//!
//! # Core Guarantees
//!
//! - **FIFO by due time**: every job at an earlier due timestamp is
//!   dispatched before any later timestamp is queried
//! - **Exactly once per drain pass**: a popped job is dispatched once
//!   and never revisited; exclusivity across workers rests on the
//!   store's atomic pop
//! - **Cooperative shutdown**: termination signals flip a flag that is
//!   only read between cycles, so an in-flight drain always completes
//!
//! # Modules
//!
//! - [`poller`] - Polling loop, drain engine, and shutdown coordination
//! - [`store`] - Delay-store and dispatch-sink traits plus in-memory
//!   backends
//! - [`events`] - Pre-dispatch event bus and JSONL event log
//! - [`domain`] - Job, horizon, and worker identity types
//! - [`daemon`] - Background process control (PID file, start/stop)
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod events;
pub mod poller;
pub mod store;

// Re-export commonly used types
pub use config::{Config, EventsConfig, PollConfig};
pub use daemon::{DaemonManager, DaemonStatus};
pub use domain::{Horizon, ScheduledJob, WorkerIdentity};
pub use events::{DispatchEvent, EventBus, EventLogEntry, EventLogger};
pub use poller::{Phase, Poller, Shutdown, StatusLine, DEFAULT_POLL_INTERVAL};
pub use store::{
    DelayStore, DispatchError, DispatchSink, DispatchedJob, MemoryDelayStore, MemoryDispatchSink,
    StoreError,
};
