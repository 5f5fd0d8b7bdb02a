use std::sync::Arc;

use relay_boards::{BoardCoordinator, RelayHardware};
use relay_db::{PgBoardStore, PgEquipmentLockStore, PgSettingsStore};
use relay_events::ChangeBus;
use relay_locks::EquipmentLockService;
use relay_serial::{SerialOpener, SerialSessionManager};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: every field is an `Arc` or a handle around one.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: relay_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Relay and lock change notifications.
    pub bus: Arc<ChangeBus>,
    /// The single issuer of relay board commands.
    pub boards: BoardCoordinator,
    /// Equipment lock protocol.
    pub locks: Arc<EquipmentLockService>,
    /// Serial console sessions.
    pub serial: SerialSessionManager,
    /// Cancelled when the process starts shutting down; ends live streams
    /// and background jobs.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the PostgreSQL-backed services around one bus.
    pub fn new(
        pool: relay_db::DbPool,
        config: ServerConfig,
        hardware: Arc<dyn RelayHardware>,
        opener: Arc<dyn SerialOpener>,
    ) -> Self {
        let bus = Arc::new(ChangeBus::default());

        let boards = BoardCoordinator::new(
            Arc::new(PgBoardStore::new(pool.clone())),
            hardware,
            Arc::clone(&bus),
            config.board_timings,
        );

        let locks = Arc::new(EquipmentLockService::new(
            Arc::new(PgEquipmentLockStore::new(pool.clone())),
            Arc::new(PgSettingsStore::new(pool.clone())),
            Arc::clone(&bus),
        ));

        let serial = SerialSessionManager::new(opener, config.serial);

        Self {
            pool,
            config: Arc::new(config),
            bus,
            boards,
            locks,
            serial,
            shutdown: CancellationToken::new(),
        }
    }
}
