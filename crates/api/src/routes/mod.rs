pub mod boards;
pub mod equipment;
pub mod health;
pub mod relay;
pub mod serial;
pub mod settings;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /relay                                   toggle (POST), state (GET)
/// /relay/ping                              board reachability (GET)
/// /relay/state                             persisted states (GET)
/// /relay/events                            live update stream, SSE (GET)
///
/// /equipment/{id}/lock                     status, lock, unlock (GET, POST, DELETE)
/// /equipment/{id}/lock/renew               renew lease (POST)
/// /equipment/{id}/lock/force-release       admin release (POST)
/// /equipment/{id}/serial-ports             serial console assignments (GET)
///
/// /boards/{id}/slots                       free relay ranges (GET)
///
/// /settings/lock                           lock lease settings (GET, PUT)
///
/// /serial/ports                            host serial devices (GET)
/// /serial/ws                               serial viewer, WebSocket
/// ```
///
/// Every route requires an authenticated user (enforced by handler
/// extractors).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/relay", relay::router())
        .nest("/equipment", equipment::router())
        .nest("/boards", boards::router())
        .nest("/settings", settings::router())
        .nest("/serial", serial::router())
}
