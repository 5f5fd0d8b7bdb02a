use serde::Serialize;

use crate::relay_state::RelayState;
use crate::types::DbId;

/// A physical relay controller as the coordination layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayBoard {
    pub id: DbId,
    pub name: String,
    /// Host (and optional port) the board's HTTP interface answers on.
    pub ip_address: String,
    pub total_relays: i32,
    pub relay_state: RelayState,
}

impl RelayBoard {
    /// Relay count as an index bound.
    pub fn relay_count(&self) -> usize {
        usize::try_from(self.total_relays).unwrap_or(0)
    }
}
