//! Board coordinator.
//!
//! [`BoardCoordinator`] is the only component that talks to relay boards.
//! Every hardware-touching operation on a board runs inside that board's
//! critical section (a FIFO `tokio::sync::Mutex`), so no two commands to the
//! same board are ever in flight together. Different boards have different
//! sections and proceed in parallel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use relay_core::board::RelayBoard;
use relay_core::ports::{BoardStore, StoreError};
use relay_core::relay_state::RelayState;
use relay_core::types::DbId;
use relay_events::{ChangeBus, RelayChanged};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::cache::{BoardStateCache, DEFAULT_CACHE_TTL};
use crate::hardware::{HardwareError, RelayHardware};
use crate::status::parse_relay_status;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timeouts and delays used by the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct BoardTimings {
    /// Bound on user-initiated commands and syncs.
    pub command_timeout: Duration,
    /// Bound on each board's sync during a background sweep.
    pub background_timeout: Duration,
    /// Bound on reachability probes.
    pub ping_timeout: Duration,
    /// How long a cached state is served without asking the board.
    pub cache_ttl: Duration,
    /// Delay between a toggle and its confirmatory sync.
    pub resync_delay: Duration,
}

impl Default for BoardTimings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(10),
            background_timeout: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(3),
            cache_ttl: DEFAULT_CACHE_TTL,
            resync_delay: Duration::from_millis(200),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Board {0} not found")]
    BoardNotFound(DbId),

    #[error("Relay index {index} is out of range for a board with {total} relays")]
    InvalidRelayIndex { index: i64, total: i32 },

    #[error("Board {board_id} is unreachable: {source}")]
    HardwareUnreachable {
        board_id: DbId,
        #[source]
        source: HardwareError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one [`BoardCoordinator::reconcile_all`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub synced: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Shared handle to the board coordination layer. Cheap to clone.
#[derive(Clone)]
pub struct BoardCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn BoardStore>,
    hardware: Arc<dyn RelayHardware>,
    bus: Arc<ChangeBus>,
    cache: BoardStateCache,
    timings: BoardTimings,
    /// One critical section per board, created on first use.
    sections: RwLock<HashMap<DbId, Arc<Mutex<()>>>>,
    /// When the last [`BoardCoordinator::reconcile_all`] finished.
    last_sweep: RwLock<Option<Instant>>,
}

impl BoardCoordinator {
    pub fn new(
        store: Arc<dyn BoardStore>,
        hardware: Arc<dyn RelayHardware>,
        bus: Arc<ChangeBus>,
        timings: BoardTimings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                hardware,
                bus,
                cache: BoardStateCache::new(timings.cache_ttl),
                timings,
                sections: RwLock::new(HashMap::new()),
                last_sweep: RwLock::new(None),
            }),
        }
    }

    pub fn timings(&self) -> &BoardTimings {
        &self.inner.timings
    }

    /// Pulse relay `relay_index` (0-based) and return the resulting state.
    ///
    /// The new state is persisted, cached and published as soon as the board
    /// acknowledges the pulse; a confirmatory sync follows after
    /// [`BoardTimings::resync_delay`] to correct any drift. If the store
    /// write fails the error is returned and that sync repairs the row.
    pub async fn toggle_relay(&self, board_id: DbId, relay_index: i64) -> Result<RelayState, BoardError> {
        let board = self.find_board(board_id).await?;
        let index = usize::try_from(relay_index)
            .ok()
            .filter(|i| *i < board.relay_count())
            .ok_or(BoardError::InvalidRelayIndex {
                index: relay_index,
                total: board.total_relays,
            })?;

        let new_state = {
            let section = self.section(board_id).await;
            let guard = section.lock().await;

            let timeout = self.inner.timings.command_timeout;
            bounded(timeout, self.inner.hardware.pulse(&board.ip_address, index + 1, timeout))
                .await
                .map_err(|source| BoardError::HardwareUnreachable { board_id, source })?;

            let base = match self.inner.cache.current(board_id).await {
                Some(entry) if entry.state.len() == board.relay_count() => entry.state,
                _ => board.relay_state.clone(),
            };
            let new_state = base.toggled(index).ok_or(BoardError::InvalidRelayIndex {
                index: relay_index,
                total: board.total_relays,
            })?;

            if let Err(e) = self.inner.store.save_relay_state(board_id, &new_state).await {
                // The relay did flip. Forget the cached state so the next
                // sync compares against the store and repairs it.
                self.inner.cache.invalidate(board_id).await;
                drop(guard);
                tracing::warn!(board_id, relay_index, error = %e, "Toggled state not persisted");
                self.schedule_resync(board_id);
                return Err(e.into());
            }
            self.inner.cache.store(board_id, new_state.clone()).await;
            self.inner
                .bus
                .publish_relay(RelayChanged::new(board_id, new_state.clone()));
            new_state
        };

        tracing::info!(board_id, relay_index, state = %new_state, "Relay toggled");
        self.schedule_resync(board_id);
        Ok(new_state)
    }

    /// The board's state: cached if fresh, otherwise synced from hardware.
    pub async fn get_state(&self, board_id: DbId) -> Result<RelayState, BoardError> {
        if let Some(state) = self.inner.cache.fresh(board_id).await {
            return Ok(state);
        }
        self.sync_state(board_id).await
    }

    /// Read the board's true state from hardware and reconcile cache and
    /// store with it, publishing a change if it differs.
    pub async fn sync_state(&self, board_id: DbId) -> Result<RelayState, BoardError> {
        let board = self.find_board(board_id).await?;
        self.sync_board(&board, self.inner.timings.command_timeout).await
    }

    /// Sync every board concurrently. Per-board failures are logged and
    /// counted, never propagated.
    pub async fn reconcile_all(&self) -> Result<ReconcileSummary, BoardError> {
        let boards = self.inner.store.list_boards().await?;
        let timeout = self.inner.timings.background_timeout;

        let results = join_all(boards.iter().map(|board| self.sync_board(board, timeout))).await;

        let mut summary = ReconcileSummary::default();
        for (board, result) in boards.iter().zip(results) {
            match result {
                Ok(_) => summary.synced += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::debug!(board_id = board.id, error = %e, "Board sync failed");
                }
            }
        }
        *self.inner.last_sweep.write().await = Some(Instant::now());
        Ok(summary)
    }

    /// When the last full sweep finished, if one has.
    pub async fn last_sweep(&self) -> Option<Instant> {
        *self.inner.last_sweep.read().await
    }

    /// Whether the board answers within the ping timeout. Does not take the
    /// board's critical section and does not touch cache or store.
    pub async fn check_connection(&self, board_id: DbId) -> Result<bool, BoardError> {
        let board = self.find_board(board_id).await?;
        Ok(self.ping(&board).await)
    }

    /// Reachability of every board.
    pub async fn check_all_connections(&self) -> Result<HashMap<DbId, bool>, BoardError> {
        let boards = self.inner.store.list_boards().await?;
        let online = join_all(boards.iter().map(|board| self.ping(board))).await;
        Ok(boards.iter().map(|board| board.id).zip(online).collect())
    }

    /// Persisted relay states, keyed by board id, without touching hardware.
    /// `board_id` narrows the result to one board.
    pub async fn persisted_states(&self, board_id: Option<DbId>) -> Result<HashMap<DbId, RelayState>, BoardError> {
        let boards = match board_id {
            Some(id) => vec![self.find_board(id).await?],
            None => self.inner.store.list_boards().await?,
        };
        Ok(boards.into_iter().map(|board| (board.id, board.relay_state)).collect())
    }

    /// Last-known state of every board: the cached value when there is one
    /// (fresh or not), the persisted value otherwise. Never touches hardware.
    pub async fn known_states(&self) -> Result<Vec<RelayChanged>, BoardError> {
        let boards = self.inner.store.list_boards().await?;
        let mut states = Vec::with_capacity(boards.len());
        for board in &boards {
            let event = match self.inner.cache.current(board.id).await {
                Some(entry) if entry.state.len() == board.relay_count() => RelayChanged::new(board.id, entry.state),
                _ => RelayChanged::from(board),
            };
            states.push(event);
        }
        Ok(states)
    }

    // ---- private helpers ----

    async fn find_board(&self, board_id: DbId) -> Result<RelayBoard, BoardError> {
        self.inner
            .store
            .find_board(board_id)
            .await?
            .ok_or(BoardError::BoardNotFound(board_id))
    }

    /// The board's critical section, inserted on first use.
    async fn section(&self, board_id: DbId) -> Arc<Mutex<()>> {
        if let Some(section) = self.inner.sections.read().await.get(&board_id) {
            return Arc::clone(section);
        }
        let mut sections = self.inner.sections.write().await;
        Arc::clone(sections.entry(board_id).or_default())
    }

    async fn sync_board(&self, board: &RelayBoard, timeout: Duration) -> Result<RelayState, BoardError> {
        let board_id = board.id;
        let section = self.section(board_id).await;
        let _guard = section.lock().await;

        let cached = self.inner.cache.current(board_id).await;
        let revision = cached.as_ref().map_or(0, |entry| entry.revision);

        let document = bounded(timeout, self.inner.hardware.fetch_status(&board.ip_address, timeout))
            .await
            .map_err(|source| BoardError::HardwareUnreachable { board_id, source })?;
        let state = parse_relay_status(&document, board.relay_count());

        let previous = cached.map_or_else(|| board.relay_state.clone(), |entry| entry.state);
        let changed = state != previous || state != board.relay_state;

        if self
            .inner
            .cache
            .store_if_current(board_id, state.clone(), revision)
            .await
            .is_none()
        {
            tracing::debug!(board_id, "Discarding sync result older than cached state");
            return Ok(self
                .inner
                .cache
                .current(board_id)
                .await
                .map_or(state, |entry| entry.state));
        }

        // Hardware is the truth; the stored row is rewritten on every sync
        // so a missed write or a malformed row does not outlive one sweep.
        if let Err(e) = self.inner.store.save_relay_state(board_id, &state).await {
            self.inner.cache.invalidate(board_id).await;
            return Err(e.into());
        }
        if changed {
            self.inner
                .bus
                .publish_relay(RelayChanged::new(board_id, state.clone()));
            tracing::info!(board_id, from = %previous, to = %state, "Relay state drift corrected");
        }

        Ok(state)
    }

    async fn ping(&self, board: &RelayBoard) -> bool {
        let timeout = self.inner.timings.ping_timeout;
        tokio::time::timeout(timeout, self.inner.hardware.ping(&board.ip_address, timeout))
            .await
            .unwrap_or(false)
    }

    fn schedule_resync(&self, board_id: DbId) {
        let this = self.clone();
        let delay = self.inner.timings.resync_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = match this.find_board(board_id).await {
                Ok(board) => this.sync_board(&board, this.inner.timings.background_timeout).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(board_id, error = %e, "Post-toggle resync failed");
            }
        });
    }
}

/// Run a hardware call under an outer deadline, so an implementation that
/// ignores its own timeout still releases the board's critical section.
async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, HardwareError>
where
    F: Future<Output = Result<T, HardwareError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(HardwareError::Timeout(timeout)))
}
