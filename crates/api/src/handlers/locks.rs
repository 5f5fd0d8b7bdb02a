//! Handlers for the equipment lock endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use relay_core::lock::{EquipmentLock, LockStatus};
use relay_core::types::{DbId, Timestamp};
use relay_locks::RenewOutcome;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Lock status as seen by the caller, plus whether to prompt a renewal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatusResponse {
    #[serde(flatten)]
    pub status: LockStatus,
    pub should_warn: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub renewed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_expires_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /equipment/{id}/lock
pub async fn get_lock_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(equipment_id): Path<DbId>,
) -> AppResult<Json<LockStatusResponse>> {
    let status = state.locks.get_status(equipment_id, &user.actor()).await?;
    let should_warn = status.is_owner && status.should_warn(Utc::now());
    Ok(Json(LockStatusResponse {
        status,
        should_warn,
    }))
}

/// POST /equipment/{id}/lock
pub async fn lock_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(equipment_id): Path<DbId>,
) -> AppResult<Json<EquipmentLock>> {
    let lock = state.locks.lock(equipment_id, &user.actor()).await?;
    Ok(Json(lock))
}

/// POST /equipment/{id}/lock/renew
///
/// `renewed: false` tells the caller the lease was lost (expired or taken
/// over) before the renewal landed.
pub async fn renew_lock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(equipment_id): Path<DbId>,
) -> AppResult<Json<RenewResponse>> {
    let response = match state.locks.renew(equipment_id, &user.actor()).await? {
        RenewOutcome::Renewed(lock) => RenewResponse {
            renewed: true,
            lock_expires_at: lock.lock_expires_at,
        },
        RenewOutcome::Lost => RenewResponse {
            renewed: false,
            lock_expires_at: None,
        },
    };
    Ok(Json(response))
}

/// DELETE /equipment/{id}/lock
pub async fn unlock_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(equipment_id): Path<DbId>,
) -> AppResult<Json<SuccessResponse>> {
    state.locks.unlock(equipment_id, &user.actor()).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /equipment/{id}/lock/force-release
pub async fn force_release(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(equipment_id): Path<DbId>,
) -> AppResult<Json<SuccessResponse>> {
    state.locks.force_unlock(equipment_id, &admin.actor()).await?;
    tracing::info!(equipment_id, admin_id = admin.user_id, "Equipment lock force-released");
    Ok(Json(SuccessResponse { success: true }))
}
