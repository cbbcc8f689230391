//! The polling loop, drain engine, and cooperative shutdown

mod core;
mod shutdown;
mod status;

pub use self::core::{DEFAULT_POLL_INTERVAL, Poller};
pub use shutdown::Shutdown;
pub use status::{Phase, StatusLine};
