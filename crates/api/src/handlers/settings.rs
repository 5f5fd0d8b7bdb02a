//! Handlers for runtime settings.

use axum::extract::State;
use axum::Json;
use relay_core::lock::LockSettings;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

/// GET /settings/lock
pub async fn get_lock_settings(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<LockSettings>> {
    Ok(Json(state.locks.settings().await?))
}

/// PUT /settings/lock
pub async fn update_lock_settings(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<LockSettings>,
) -> AppResult<Json<LockSettings>> {
    let saved = state.locks.update_settings(input, &admin.actor()).await?;
    Ok(Json(saved))
}
