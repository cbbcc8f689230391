//! Drain horizon: an explicit instant, or "now"

use chrono::{DateTime, Utc};

/// Upper time bound for a drain query.
///
/// `Now` is the unset sentinel. It is resolved against the current wall
/// clock by the store on every query, not once per drain call, so a
/// drain in progress keeps picking up timestamps that became due after
/// the drain started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Horizon {
    /// Use the current wall-clock time, re-evaluated per query
    #[default]
    Now,

    /// Explicit upper bound
    At(DateTime<Utc>),
}

impl Horizon {
    /// Resolve to a concrete instant, given the caller's "now"
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Horizon::Now => now,
            Horizon::At(instant) => *instant,
        }
    }
}

impl From<DateTime<Utc>> for Horizon {
    fn from(instant: DateTime<Utc>) -> Self {
        Horizon::At(instant)
    }
}
