//! Relay manager change notification.
//!
//! - [`ChangeBus`]: in-process publish/subscribe hub with one
//!   `tokio::sync::broadcast` channel per event kind.
//! - [`RelayChanged`] / [`LockChanged`]: the two event kinds.
//! - [`LiveMessage`]: the JSON envelope pushed to live viewers.

pub mod bus;
pub mod message;

pub use bus::{ChangeBus, LockChanged, RelayChanged};
pub use message::LiveMessage;
