//! Storage ports.
//!
//! The coordination services only ever talk to persistence through these
//! traits. `relay-db` provides the PostgreSQL adapters; tests provide
//! in-memory ones.

use async_trait::async_trait;

use crate::board::RelayBoard;
use crate::lock::{EquipmentLock, LockClaim, LockSettings};
use crate::relay_state::RelayState;
use crate::types::{DbId, Timestamp};

/// A failure inside the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Board rows, as read and written by the board coordinator.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn find_board(&self, board_id: DbId) -> Result<Option<RelayBoard>, StoreError>;

    async fn list_boards(&self) -> Result<Vec<RelayBoard>, StoreError>;

    /// Overwrite the persisted relay state of a board.
    async fn save_relay_state(&self, board_id: DbId, state: &RelayState) -> Result<(), StoreError>;
}

/// Lock fields on equipment rows.
///
/// Every mutating method is a single atomic conditional update; callers
/// learn the outcome from the returned row or affected-row count, never
/// from a separate read.
#[async_trait]
pub trait EquipmentLockStore: Send + Sync {
    /// Lock fields of one equipment, with holder identity resolved.
    async fn find_lock(&self, equipment_id: DbId) -> Result<Option<EquipmentLock>, StoreError>;

    /// Every equipment that currently has an owner (stale ones included).
    async fn list_held_locks(&self) -> Result<Vec<EquipmentLock>, StoreError>;

    /// Take the lock when it is free, stale, already ours, or the claim
    /// carries an admin override. `None` means the guard rejected the claim
    /// (or the equipment does not exist).
    async fn try_acquire(&self, claim: &LockClaim) -> Result<Option<EquipmentLock>, StoreError>;

    /// Push the expiry forward when `user_id` still owns the lock.
    async fn extend(
        &self,
        equipment_id: DbId,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<EquipmentLock>, StoreError>;

    /// Clear the lock when `user_id` owns it, or when `admin_override` is set
    /// and anyone owns it. Returns the affected-row count.
    async fn release(&self, equipment_id: DbId, user_id: DbId, admin_override: bool) -> Result<u64, StoreError>;

    /// Clear the lock unconditionally. Returns the affected-row count.
    async fn force_release(&self, equipment_id: DbId) -> Result<u64, StoreError>;

    /// Clear a lock whose expiry still equals `observed_expiry` and is not
    /// after `now`. `now` is the caller's clock, the same one that stamps
    /// new leases.
    ///
    /// A concurrent renewal changes the expiry, so it wins over the clear.
    async fn clear_expired(
        &self,
        equipment_id: DbId,
        observed_expiry: Timestamp,
        now: Timestamp,
    ) -> Result<u64, StoreError>;

    /// The equipment whose relay range on `board_id` covers `relay_number`.
    async fn find_equipment_on_relay(&self, board_id: DbId, relay_number: i32) -> Result<Option<DbId>, StoreError>;
}

/// Global runtime settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current lock settings, creating the defaults on first use.
    async fn lock_settings(&self) -> Result<LockSettings, StoreError>;

    async fn update_lock_settings(&self, settings: &LockSettings) -> Result<LockSettings, StoreError>;
}
