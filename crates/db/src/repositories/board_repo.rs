//! Repository for the `relay_boards` table.

use relay_core::types::DbId;
use sqlx::PgPool;

use crate::models::board::RelayBoardRow;

/// Column list for `relay_boards` queries.
const COLUMNS: &str = "id, name, ip_address, total_relays, relay_state, created_at, updated_at";

/// Provides query operations for relay boards.
pub struct BoardRepo;

impl BoardRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RelayBoardRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM relay_boards WHERE id = $1");
        sqlx::query_as::<_, RelayBoardRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all boards, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<RelayBoardRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM relay_boards ORDER BY id");
        sqlx::query_as::<_, RelayBoardRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the persisted relay state. Returns the affected-row count.
    pub async fn update_relay_state(pool: &PgPool, id: DbId, relay_state: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE relay_boards SET relay_state = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(relay_state)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
