use axum::routing::get;
use axum::Router;

use crate::handlers::settings;
use crate::state::AppState;

/// Routes mounted at `/settings`.
///
/// ```text
/// GET /lock   -> get_lock_settings
/// PUT /lock   -> update_lock_settings (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/lock",
        get(settings::get_lock_settings).put(settings::update_lock_settings),
    )
}
