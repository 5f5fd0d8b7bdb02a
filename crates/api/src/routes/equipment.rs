//! Route definitions for equipment lock and console endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{locks, serial};
use crate::state::AppState;

/// Routes mounted at `/equipment`.
///
/// ```text
/// GET    /{id}/lock                -> get_lock_status
/// POST   /{id}/lock                -> lock_equipment
/// DELETE /{id}/lock                -> unlock_equipment
/// POST   /{id}/lock/renew          -> renew_lock
/// POST   /{id}/lock/force-release  -> force_release (admin)
/// GET    /{id}/serial-ports        -> equipment_serial_ports
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/lock",
            get(locks::get_lock_status)
                .post(locks::lock_equipment)
                .delete(locks::unlock_equipment),
        )
        .route("/{id}/lock/renew", post(locks::renew_lock))
        .route("/{id}/lock/force-release", post(locks::force_release))
        .route("/{id}/serial-ports", get(serial::equipment_serial_ports))
}
