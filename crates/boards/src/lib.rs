//! Relay board coordination.
//!
//! - [`BoardCoordinator`]: the single issuer of physical commands, with one
//!   FIFO critical section per board.
//! - [`BoardStateCache`]: short-lived, revisioned projection of each
//!   board's relay state.
//! - [`DevantechClient`]: HTTP/XML protocol client implementing
//!   [`RelayHardware`].
//! - [`status::parse_relay_status`]: tolerant decoder for the board's
//!   status document.

pub mod cache;
pub mod coordinator;
pub mod devantech;
pub mod hardware;
pub mod status;

pub use cache::BoardStateCache;
pub use coordinator::{BoardCoordinator, BoardError, BoardTimings, ReconcileSummary};
pub use devantech::DevantechClient;
pub use hardware::{HardwareError, RelayHardware};
