//! Repository for the single-row `settings` table.

use sqlx::PgPool;

use crate::models::settings::{SettingsRow, GLOBAL_SETTINGS_ID};

const COLUMNS: &str = "id, lock_timeout_mins, warning_before_mins, updated_at";

/// Provides access to global runtime settings.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Fetch the global row, inserting the column defaults if it is missing.
    pub async fn get_or_create(pool: &PgPool) -> Result<SettingsRow, sqlx::Error> {
        sqlx::query("INSERT INTO settings (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(GLOBAL_SETTINGS_ID)
            .execute(pool)
            .await?;

        let query = format!("SELECT {COLUMNS} FROM settings WHERE id = $1");
        sqlx::query_as::<_, SettingsRow>(&query)
            .bind(GLOBAL_SETTINGS_ID)
            .fetch_one(pool)
            .await
    }

    /// Insert or replace the lock window of the global row.
    pub async fn upsert_lock_window(
        pool: &PgPool,
        lock_timeout_mins: i32,
        warning_before_mins: i32,
    ) -> Result<SettingsRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO settings (id, lock_timeout_mins, warning_before_mins) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE \
             SET lock_timeout_mins = EXCLUDED.lock_timeout_mins, \
                 warning_before_mins = EXCLUDED.warning_before_mins, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SettingsRow>(&query)
            .bind(GLOBAL_SETTINGS_ID)
            .bind(lock_timeout_mins)
            .bind(warning_before_mins)
            .fetch_one(pool)
            .await
    }
}
