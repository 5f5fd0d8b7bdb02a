//! Route definitions for relay board endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::{live, relay};
use crate::state::AppState;

/// Routes mounted at `/relay`.
///
/// ```text
/// POST /          -> toggle_relay
/// GET  /          -> get_relay_state
/// GET  /ping      -> ping_boards
/// GET  /state     -> persisted_states
/// GET  /events    -> live_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(relay::get_relay_state).post(relay::toggle_relay))
        .route("/ping", get(relay::ping_boards))
        .route("/state", get(relay::persisted_states))
        .route("/events", get(live::live_events))
}
