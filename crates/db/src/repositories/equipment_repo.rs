//! Repository for equipment placement and lock columns.
//!
//! Every lock transition is one conditional `UPDATE ... WHERE` statement so
//! that two users racing for the same equipment resolve inside PostgreSQL
//! with exactly one winner.

use relay_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::equipment::{EquipmentLockRow, EquipmentPlacement};

/// Projection of a lock row joined with its holder. Expects the equipment
/// relation aliased as `e`.
const LOCK_SELECT: &str = "\
    e.id AS equipment_id, e.locked_by_id, e.locked_at, e.lock_expires_at, \
    u.email AS holder_email, u.name AS holder_name";

/// Columns returned from lock-mutating updates.
const LOCK_RETURNING: &str = "id, locked_by_id, locked_at, lock_expires_at";

/// Provides lock and placement queries on the `equipment` table.
pub struct EquipmentRepo;

impl EquipmentRepo {
    pub async fn find_lock(pool: &PgPool, equipment_id: DbId) -> Result<Option<EquipmentLockRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCK_SELECT} FROM equipment e \
             LEFT JOIN users u ON u.id = e.locked_by_id \
             WHERE e.id = $1"
        );
        sqlx::query_as::<_, EquipmentLockRow>(&query)
            .bind(equipment_id)
            .fetch_optional(pool)
            .await
    }

    /// Every equipment with an owner, including expired leases.
    pub async fn list_held_locks(pool: &PgPool) -> Result<Vec<EquipmentLockRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCK_SELECT} FROM equipment e \
             LEFT JOIN users u ON u.id = e.locked_by_id \
             WHERE e.locked_by_id IS NOT NULL \
             ORDER BY e.id"
        );
        sqlx::query_as::<_, EquipmentLockRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Claim the lock for `user_id`.
    ///
    /// Succeeds when the equipment is unlocked, already held by the caller,
    /// held by an expired lease, or `admin_override` is set. Returns `None`
    /// when the guard matched no row.
    pub async fn try_lock(
        pool: &PgPool,
        equipment_id: DbId,
        user_id: DbId,
        now: Timestamp,
        expires_at: Timestamp,
        admin_override: bool,
    ) -> Result<Option<EquipmentLockRow>, sqlx::Error> {
        let query = format!(
            "WITH updated AS ( \
                UPDATE equipment \
                SET locked_by_id = $2, locked_at = $3, lock_expires_at = $4, updated_at = NOW() \
                WHERE id = $1 \
                  AND (locked_by_id IS NULL \
                       OR locked_by_id = $2 \
                       OR lock_expires_at <= $3 \
                       OR $5) \
                RETURNING {LOCK_RETURNING} \
             ) \
             SELECT {LOCK_SELECT} FROM updated e \
             LEFT JOIN users u ON u.id = e.locked_by_id"
        );
        sqlx::query_as::<_, EquipmentLockRow>(&query)
            .bind(equipment_id)
            .bind(user_id)
            .bind(now)
            .bind(expires_at)
            .bind(admin_override)
            .fetch_optional(pool)
            .await
    }

    /// Move the expiry of a lock still owned by `user_id`.
    pub async fn renew_lock(
        pool: &PgPool,
        equipment_id: DbId,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<EquipmentLockRow>, sqlx::Error> {
        let query = format!(
            "WITH updated AS ( \
                UPDATE equipment \
                SET lock_expires_at = $3, updated_at = NOW() \
                WHERE id = $1 AND locked_by_id = $2 \
                RETURNING {LOCK_RETURNING} \
             ) \
             SELECT {LOCK_SELECT} FROM updated e \
             LEFT JOIN users u ON u.id = e.locked_by_id"
        );
        sqlx::query_as::<_, EquipmentLockRow>(&query)
            .bind(equipment_id)
            .bind(user_id)
            .bind(expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Clear a lock held by `user_id` (or by anyone, with `admin_override`).
    pub async fn unlock(
        pool: &PgPool,
        equipment_id: DbId,
        user_id: DbId,
        admin_override: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment \
             SET locked_by_id = NULL, locked_at = NULL, lock_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 \
               AND (locked_by_id = $2 OR ($3 AND locked_by_id IS NOT NULL))",
        )
        .bind(equipment_id)
        .bind(user_id)
        .bind(admin_override)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Clear the lock whatever its state.
    pub async fn force_unlock(pool: &PgPool, equipment_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment \
             SET locked_by_id = NULL, locked_at = NULL, lock_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(equipment_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Clear an expired lock, guarded by the expiry the caller observed.
    /// Expiry is judged against `now`, not the database clock.
    pub async fn clear_expired(
        pool: &PgPool,
        equipment_id: DbId,
        observed_expiry: Timestamp,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment \
             SET locked_by_id = NULL, locked_at = NULL, lock_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 \
               AND locked_by_id IS NOT NULL \
               AND lock_expires_at = $2 \
               AND lock_expires_at <= $3",
        )
        .bind(equipment_id)
        .bind(observed_expiry)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Placements on one board, ordered by start relay.
    pub async fn list_placements(pool: &PgPool, board_id: DbId) -> Result<Vec<EquipmentPlacement>, sqlx::Error> {
        sqlx::query_as::<_, EquipmentPlacement>(
            "SELECT id, board_id, start_relay, relay_count FROM equipment \
             WHERE board_id = $1 \
             ORDER BY start_relay ASC",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// The equipment whose range covers the 1-based `relay_number`.
    pub async fn find_on_relay(pool: &PgPool, board_id: DbId, relay_number: i32) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM equipment \
             WHERE board_id = $1 \
               AND $2 BETWEEN start_relay AND start_relay + relay_count - 1 \
             LIMIT 1",
        )
        .bind(board_id)
        .bind(relay_number)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }
}
