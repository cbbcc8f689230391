//! Dispatch event bus and persistence
//!
//! Components emit events, observers subscribe. Delivery is
//! fire-and-forget: the dispatcher never inspects what subscribers do
//! with an event, and a bus with no subscribers drops them silently.

mod bus;
mod logger;
mod types;

pub use bus::{EventBus, DEFAULT_CHANNEL_CAPACITY};
pub use logger::EventLogger;
pub use types::{DispatchEvent, EventLogEntry};
