use axum::routing::get;
use axum::Router;

use crate::handlers::boards;
use crate::state::AppState;

/// Routes mounted at `/boards`.
///
/// ```text
/// GET /{id}/slots   -> available_slots
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/slots", get(boards::available_slots))
}
