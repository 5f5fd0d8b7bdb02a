//! Global settings row.

use relay_core::lock::LockSettings;
use relay_core::types::Timestamp;
use sqlx::FromRow;

/// Primary key of the single settings row.
pub const GLOBAL_SETTINGS_ID: &str = "global";

#[derive(Debug, Clone, FromRow)]
pub struct SettingsRow {
    pub id: String,
    pub lock_timeout_mins: i32,
    pub warning_before_mins: i32,
    pub updated_at: Timestamp,
}

impl From<SettingsRow> for LockSettings {
    fn from(row: SettingsRow) -> Self {
        LockSettings {
            lock_timeout_mins: row.lock_timeout_mins,
            warning_before_mins: row.warning_before_mins,
        }
    }
}
