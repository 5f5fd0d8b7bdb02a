//! Relay board rows.

use relay_core::board::RelayBoard;
use relay_core::relay_state::RelayState;
use relay_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `relay_boards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RelayBoardRow {
    pub id: DbId,
    pub name: String,
    pub ip_address: String,
    pub total_relays: i32,
    pub relay_state: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RelayBoardRow {
    /// Convert to the domain model, forcing the state to the board's width.
    ///
    /// A stored state that is malformed, or whose length disagrees with
    /// `total_relays`, is normalised rather than rejected; the next
    /// reconciliation overwrites it with hardware truth anyway.
    pub fn into_board(self) -> RelayBoard {
        let width = usize::try_from(self.total_relays).unwrap_or(0);
        let relay_state = match RelayState::parse(&self.relay_state) {
            Ok(state) => state.fit_to(width),
            Err(e) => {
                tracing::warn!(board_id = self.id, error = %e, "Discarding malformed relay state");
                RelayState::all_off(width)
            }
        };
        RelayBoard {
            id: self.id,
            name: self.name,
            ip_address: self.ip_address,
            total_relays: self.total_relays,
            relay_state,
        }
    }
}
