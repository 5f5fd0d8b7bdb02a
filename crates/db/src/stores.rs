//! PostgreSQL adapters for the `relay-core` storage ports.

use async_trait::async_trait;
use relay_core::board::RelayBoard;
use relay_core::lock::{EquipmentLock, LockClaim, LockSettings};
use relay_core::ports::{BoardStore, EquipmentLockStore, SettingsStore, StoreError};
use relay_core::relay_state::RelayState;
use relay_core::types::{DbId, Timestamp};

use crate::repositories::{BoardRepo, EquipmentRepo, SettingsRepo};
use crate::DbPool;

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// [`BoardStore`] backed by the `relay_boards` table.
#[derive(Clone)]
pub struct PgBoardStore {
    pool: DbPool,
}

impl PgBoardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn find_board(&self, board_id: DbId) -> Result<Option<RelayBoard>, StoreError> {
        let row = BoardRepo::find_by_id(&self.pool, board_id).await.map_err(backend)?;
        Ok(row.map(|r| r.into_board()))
    }

    async fn list_boards(&self) -> Result<Vec<RelayBoard>, StoreError> {
        let rows = BoardRepo::list(&self.pool).await.map_err(backend)?;
        Ok(rows.into_iter().map(|r| r.into_board()).collect())
    }

    async fn save_relay_state(&self, board_id: DbId, state: &RelayState) -> Result<(), StoreError> {
        BoardRepo::update_relay_state(&self.pool, board_id, state.as_str())
            .await
            .map_err(backend)?;
        Ok(())
    }
}

/// [`EquipmentLockStore`] backed by the lock columns of `equipment`.
#[derive(Clone)]
pub struct PgEquipmentLockStore {
    pool: DbPool,
}

impl PgEquipmentLockStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EquipmentLockStore for PgEquipmentLockStore {
    async fn find_lock(&self, equipment_id: DbId) -> Result<Option<EquipmentLock>, StoreError> {
        let row = EquipmentRepo::find_lock(&self.pool, equipment_id)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| r.into_lock()))
    }

    async fn list_held_locks(&self) -> Result<Vec<EquipmentLock>, StoreError> {
        let rows = EquipmentRepo::list_held_locks(&self.pool).await.map_err(backend)?;
        Ok(rows.into_iter().map(|r| r.into_lock()).collect())
    }

    async fn try_acquire(&self, claim: &LockClaim) -> Result<Option<EquipmentLock>, StoreError> {
        let row = EquipmentRepo::try_lock(
            &self.pool,
            claim.equipment_id,
            claim.user_id,
            claim.now,
            claim.expires_at,
            claim.admin_override,
        )
        .await
        .map_err(backend)?;
        Ok(row.map(|r| r.into_lock()))
    }

    async fn extend(
        &self,
        equipment_id: DbId,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<EquipmentLock>, StoreError> {
        let row = EquipmentRepo::renew_lock(&self.pool, equipment_id, user_id, expires_at)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| r.into_lock()))
    }

    async fn release(&self, equipment_id: DbId, user_id: DbId, admin_override: bool) -> Result<u64, StoreError> {
        EquipmentRepo::unlock(&self.pool, equipment_id, user_id, admin_override)
            .await
            .map_err(backend)
    }

    async fn force_release(&self, equipment_id: DbId) -> Result<u64, StoreError> {
        EquipmentRepo::force_unlock(&self.pool, equipment_id)
            .await
            .map_err(backend)
    }

    async fn clear_expired(
        &self,
        equipment_id: DbId,
        observed_expiry: Timestamp,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        EquipmentRepo::clear_expired(&self.pool, equipment_id, observed_expiry, now)
            .await
            .map_err(backend)
    }

    async fn find_equipment_on_relay(&self, board_id: DbId, relay_number: i32) -> Result<Option<DbId>, StoreError> {
        EquipmentRepo::find_on_relay(&self.pool, board_id, relay_number)
            .await
            .map_err(backend)
    }
}

/// [`SettingsStore`] backed by the single-row `settings` table.
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: DbPool,
}

impl PgSettingsStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn lock_settings(&self) -> Result<LockSettings, StoreError> {
        let row = SettingsRepo::get_or_create(&self.pool).await.map_err(backend)?;
        Ok(row.into())
    }

    async fn update_lock_settings(&self, settings: &LockSettings) -> Result<LockSettings, StoreError> {
        let row = SettingsRepo::upsert_lock_window(
            &self.pool,
            settings.lock_timeout_mins,
            settings.warning_before_mins,
        )
        .await
        .map_err(backend)?;
        Ok(row.into())
    }
}
