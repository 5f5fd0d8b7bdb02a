//! Serial console assignments per equipment.

use relay_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A serial console attached to one board of an equipment.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialPortConfig {
    pub id: DbId,
    pub equipment_id: DbId,
    pub board_index: i32,
    /// Host device path, e.g. `/dev/ttyUSB0`. `None` until configured.
    pub serial_id: Option<String>,
    pub label: Option<String>,
    pub baud_rate: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
