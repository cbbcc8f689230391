//! Scheduled job payload

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One payload awaiting dispatch.
///
/// `queue` and `task` are non-empty strings; the scheduling API that
/// creates jobs enforces this. `args` is semantically arbitrary and
/// passed through to the dispatch sink unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Destination queue name
    pub queue: String,

    /// Task identifier understood by the downstream queue consumer
    pub task: String,

    /// Ordered argument list, opaque to the dispatcher
    #[serde(default)]
    pub args: Vec<Value>,
}

impl ScheduledJob {
    /// Create a job bound for `queue`, running `task` with `args`
    pub fn new(queue: impl Into<String>, task: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            queue: queue.into(),
            task: task.into(),
            args,
        }
    }

    /// Arguments serialized as a JSON array, for log output
    pub fn args_json(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_else(|_| "[]".to_string())
    }
}
