//! Worker phase reporting
//!
//! A human-readable status string updated at phase boundaries, for
//! external process monitoring. Observability only: nothing reads it to
//! make control-flow decisions.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Lifecycle phase of the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The worker is booting: logging configured, signals being wired
    Starting,

    /// A drain cycle is running or about to run
    ProcessingDelayedItems,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Starting => write!(f, "Starting"),
            Phase::ProcessingDelayedItems => write!(f, "Processing Delayed Items"),
        }
    }
}

/// Shared, cheaply cloneable status line
#[derive(Clone, Default)]
pub struct StatusLine {
    inner: Arc<RwLock<String>>,
}

impl StatusLine {
    /// Create an empty status line
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current phase. Never blocks the caller on a poisoned
    /// lock; status must not affect control flow.
    pub fn set(&self, phase: Phase) {
        if let Ok(mut status) = self.inner.write() {
            *status = phase.to_string();
        }
    }

    /// The most recently recorded phase string
    pub fn current(&self) -> String {
        self.inner.read().map(|status| status.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_strings() {
        assert_eq!(Phase::Starting.to_string(), "Starting");
        assert_eq!(Phase::ProcessingDelayedItems.to_string(), "Processing Delayed Items");
    }

    #[test]
    fn test_status_line_starts_empty() {
        assert_eq!(StatusLine::new().current(), "");
    }

    #[test]
    fn test_status_line_tracks_latest_phase() {
        let status = StatusLine::new();
        status.set(Phase::Starting);
        assert_eq!(status.current(), "Starting");

        status.set(Phase::ProcessingDelayedItems);
        assert_eq!(status.current(), "Processing Delayed Items");
    }

    #[test]
    fn test_clones_share_state() {
        let status = StatusLine::new();
        let observer = status.clone();

        status.set(Phase::ProcessingDelayedItems);
        assert_eq!(observer.current(), "Processing Delayed Items");
    }
}
