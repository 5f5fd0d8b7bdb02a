//! In-process change bus backed by `tokio::sync::broadcast` channels.
//!
//! [`ChangeBus`] carries two independently subscribable event kinds. It is
//! shared via `Arc<ChangeBus>` between the board coordinator, the lock
//! service and every live viewer connection.
//!
//! Delivery is at-most-once and latest-state-wins: a receiver that falls
//! behind observes `RecvError::Lagged` and skips ahead, and nothing is
//! replayed across reconnects.

use relay_core::board::RelayBoard;
use relay_core::lock::{EquipmentLock, LockHolder};
use relay_core::relay_state::RelayState;
use relay_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A board's relay state was written (optimistically or by reconciliation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayChanged {
    pub board_id: DbId,
    pub state: RelayState,
}

impl RelayChanged {
    pub fn new(board_id: DbId, state: RelayState) -> Self {
        Self { board_id, state }
    }
}

impl From<&RelayBoard> for RelayChanged {
    fn from(board: &RelayBoard) -> Self {
        Self::new(board.id, board.relay_state.clone())
    }
}

/// The lock fields of an equipment changed. All owner fields are `None`
/// when the equipment became unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockChanged {
    pub equipment_id: DbId,
    pub locked_by_id: Option<DbId>,
    pub locked_by: Option<LockHolder>,
    pub lock_expires_at: Option<Timestamp>,
}

impl LockChanged {
    /// The equipment is no longer locked.
    pub fn released(equipment_id: DbId) -> Self {
        Self {
            equipment_id,
            locked_by_id: None,
            locked_by: None,
            lock_expires_at: None,
        }
    }
}

impl From<&EquipmentLock> for LockChanged {
    fn from(lock: &EquipmentLock) -> Self {
        Self {
            equipment_id: lock.equipment_id,
            locked_by_id: lock.locked_by_id,
            locked_by: lock.locked_by.clone(),
            lock_expires_at: lock.lock_expires_at,
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeBus
// ---------------------------------------------------------------------------

/// Default buffer capacity of each broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for relay and lock changes.
///
/// Subscribing returns a [`broadcast::Receiver`]; dropping the receiver is
/// the unsubscribe. A slow or dropped subscriber never blocks publishers or
/// other subscribers.
///
/// ```rust
/// use relay_core::relay_state::RelayState;
/// use relay_events::{ChangeBus, RelayChanged};
///
/// let bus = ChangeBus::default();
/// let mut rx = bus.subscribe_relay();
/// bus.publish_relay(RelayChanged::new(1, RelayState::all_off(8)));
/// ```
pub struct ChangeBus {
    relay: broadcast::Sender<RelayChanged>,
    lock: broadcast::Sender<LockChanged>,
}

impl ChangeBus {
    /// Create a bus whose channels each buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (relay, _) = broadcast::channel(capacity);
        let (lock, _) = broadcast::channel(capacity);
        Self { relay, lock }
    }

    pub fn publish_relay(&self, event: RelayChanged) {
        // A SendError only means there are no subscribers right now.
        let _ = self.relay.send(event);
    }

    pub fn publish_lock(&self, event: LockChanged) {
        let _ = self.lock.send(event);
    }

    pub fn subscribe_relay(&self) -> broadcast::Receiver<RelayChanged> {
        self.relay.subscribe()
    }

    pub fn subscribe_lock(&self) -> broadcast::Receiver<LockChanged> {
        self.lock.subscribe()
    }

    /// Number of live relay subscribers.
    pub fn relay_subscriber_count(&self) -> usize {
        self.relay.receiver_count()
    }

    /// Number of live lock subscribers.
    pub fn lock_subscriber_count(&self) -> usize {
        self.lock.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
