//! Equipment lock protocol.
//!
//! [`EquipmentLockService`] implements the lease state machine
//! (`Unlocked` / `Locked(owner, expiresAt)`) on top of the atomic
//! conditional updates exposed by [`relay_core::ports::EquipmentLockStore`],
//! and publishes a [`relay_events::LockChanged`] for every transition.

pub mod service;

pub use service::{EquipmentLockService, LockError, RenewOutcome};
