//! Equipment placement and lock rows.

use relay_core::lock::{EquipmentLock, LockHolder};
use relay_core::occupancy::RelayRange;
use relay_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Lock columns of one equipment row, joined with the holder's identity.
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentLockRow {
    pub equipment_id: DbId,
    pub locked_by_id: Option<DbId>,
    pub locked_at: Option<Timestamp>,
    pub lock_expires_at: Option<Timestamp>,
    pub holder_email: Option<String>,
    pub holder_name: Option<String>,
}

impl EquipmentLockRow {
    pub fn into_lock(self) -> EquipmentLock {
        let locked_by = match (self.locked_by_id, self.holder_email) {
            (Some(id), Some(email)) => Some(LockHolder {
                id,
                email,
                name: self.holder_name,
            }),
            _ => None,
        };
        EquipmentLock {
            equipment_id: self.equipment_id,
            locked_by_id: self.locked_by_id,
            locked_by,
            locked_at: self.locked_at,
            lock_expires_at: self.lock_expires_at,
        }
    }
}

/// Relay range occupied by one equipment on its board.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EquipmentPlacement {
    pub id: DbId,
    pub board_id: DbId,
    pub start_relay: i32,
    pub relay_count: i32,
}

impl EquipmentPlacement {
    pub fn range(&self) -> RelayRange {
        RelayRange::new(self.start_relay, self.relay_count)
    }
}
