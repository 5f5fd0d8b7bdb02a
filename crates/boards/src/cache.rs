//! Per-board relay state cache.
//!
//! Entries are valid for a short TTL and carry a revision number drawn from
//! a process-wide monotonic counter. A writer that read revision `r` before
//! a slow hardware call only lands its result if the entry is still at `r`,
//! so a late reconciliation can never regress a newer optimistic write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use relay_core::relay_state::RelayState;
use relay_core::types::DbId;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default time-to-live for cached states.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2);

/// One cached board state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedState {
    pub state: RelayState,
    pub fetched_at: Instant,
    pub revision: u64,
}

/// Last-known relay state per board.
pub struct BoardStateCache {
    ttl: Duration,
    entries: RwLock<HashMap<DbId, CachedState>>,
    next_revision: AtomicU64,
}

impl BoardStateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            next_revision: AtomicU64::new(1),
        }
    }

    /// The cached state, only while younger than the TTL.
    pub async fn fresh(&self, board_id: DbId) -> Option<RelayState> {
        let entries = self.entries.read().await;
        entries
            .get(&board_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.state.clone())
    }

    /// The cached entry regardless of age.
    pub async fn current(&self, board_id: DbId) -> Option<CachedState> {
        self.entries.read().await.get(&board_id).cloned()
    }

    /// Unconditionally record `state` as the newest value. Returns the
    /// revision assigned to it.
    pub async fn store(&self, board_id: DbId, state: RelayState) -> u64 {
        let revision = self.bump();
        self.entries.write().await.insert(
            board_id,
            CachedState {
                state,
                fetched_at: Instant::now(),
                revision,
            },
        );
        revision
    }

    /// Record `state` only if the entry is still at `expected_revision`.
    ///
    /// Returns the new revision, or `None` when a newer write happened in
    /// between and `state` was discarded.
    pub async fn store_if_current(&self, board_id: DbId, state: RelayState, expected_revision: u64) -> Option<u64> {
        let mut entries = self.entries.write().await;
        let current = entries.get(&board_id).map_or(0, |entry| entry.revision);
        if current != expected_revision {
            return None;
        }
        let revision = self.bump();
        entries.insert(
            board_id,
            CachedState {
                state,
                fetched_at: Instant::now(),
                revision,
            },
        );
        Some(revision)
    }

    /// Drop a board's entry; the next sync then compares against the store.
    pub async fn invalidate(&self, board_id: DbId) {
        self.entries.write().await.remove(&board_id);
    }

    fn bump(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for BoardStateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
