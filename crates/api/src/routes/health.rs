use std::time::Duration;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Sweeps missed before the board sync job counts as stalled.
const MISSED_SWEEPS: u32 = 3;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when the database is unreachable or board
    /// sync has stalled.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub board_sync_healthy: bool,
    /// Seconds since the last board sweep finished; absent before the first.
    pub last_board_sweep_secs: Option<u64>,
    /// Open live update streams.
    pub live_viewers: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = relay_db::health_check(&state.pool).await.is_ok();
    let since_sweep = state.boards.last_sweep().await.map(|at| at.elapsed());
    let board_sync_healthy = !sweep_overdue(since_sweep, state.config.board_sync_interval);

    let status = if db_healthy && board_sync_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        board_sync_healthy,
        last_board_sweep_secs: since_sweep.map(|age| age.as_secs()),
        live_viewers: state.bus.relay_subscriber_count(),
    })
}

/// Nothing is overdue before the first sweep.
fn sweep_overdue(since_last: Option<Duration>, interval: Duration) -> bool {
    since_last.is_some_and(|age| age > interval * MISSED_SWEEPS)
}

/// Root-level routes, not under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
