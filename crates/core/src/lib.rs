//! Relay manager domain core.
//!
//! Pure types and rules shared by every other crate: identifiers, the
//! relay bit-string, equipment occupancy ranges, the lock lease model, and
//! the storage ports implemented by `relay-db`.

pub mod actor;
pub mod board;
pub mod error;
pub mod lock;
pub mod occupancy;
pub mod ports;
pub mod relay_state;
pub mod roles;
pub mod types;
