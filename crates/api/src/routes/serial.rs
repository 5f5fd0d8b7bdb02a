use axum::routing::get;
use axum::Router;

use crate::handlers::serial;
use crate::state::AppState;

/// Routes mounted at `/serial`.
///
/// ```text
/// GET /ports   -> list_ports
/// GET /ws      -> serial_ws (WebSocket)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ports", get(serial::list_ports))
        .route("/ws", get(serial::serial_ws))
}
