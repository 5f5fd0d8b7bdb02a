//! Wire envelope for the live update stream.

use serde::{Deserialize, Serialize};

use crate::bus::{LockChanged, RelayChanged};

/// One JSON payload of the live stream.
///
/// Serializes as `{"type":"relay","boardId":..,"state":".."}` or
/// `{"type":"lock","equipmentId":..,"lockedById":..,"lockedBy":..,"lockExpiresAt":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiveMessage {
    Relay(RelayChanged),
    Lock(LockChanged),
}

impl LiveMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<RelayChanged> for LiveMessage {
    fn from(event: RelayChanged) -> Self {
        Self::Relay(event)
    }
}

impl From<LockChanged> for LiveMessage {
    fn from(event: LockChanged) -> Self {
        Self::Lock(event)
    }
}
