//! Physical relay board port.

use std::time::Duration;

use async_trait::async_trait;

/// Errors talking to a physical board.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The HTTP request itself failed (connect, DNS, reset).
    #[error("request failed: {0}")]
    Request(String),

    /// No answer within the allotted time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The board answered with a non-2xx status code.
    #[error("board answered with status {0}")]
    Status(u16),
}

/// The commands the coordinator issues to a board.
///
/// `address` is the board's configured network address. Every call is
/// bounded by `timeout`; implementations must return (not hang) once it
/// has elapsed.
#[async_trait]
pub trait RelayHardware: Send + Sync {
    /// Pulse (toggle) the relay with 1-based number `relay_number`.
    async fn pulse(&self, address: &str, relay_number: usize, timeout: Duration) -> Result<(), HardwareError>;

    /// Fetch the raw status document.
    async fn fetch_status(&self, address: &str, timeout: Duration) -> Result<String, HardwareError>;

    /// Reachability probe. Never errors: any failure reads as offline.
    async fn ping(&self, address: &str, timeout: Duration) -> bool;
}
