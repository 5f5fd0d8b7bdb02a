use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_boards::BoardError;
use relay_core::error::CoreError;
use relay_core::ports::StoreError;
use relay_locks::LockError;
use relay_serial::SerialError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of every service crate and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the form `{ "error": message, "code": CODE }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Serial(#[from] SerialError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- Board coordination ---
            AppError::Board(err) => match err {
                BoardError::BoardNotFound(_) => {
                    (StatusCode::NOT_FOUND, "BOARD_NOT_FOUND", err.to_string())
                }
                BoardError::InvalidRelayIndex { .. } => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_RELAY_INDEX",
                    err.to_string(),
                ),
                BoardError::HardwareUnreachable { board_id, source } => {
                    tracing::warn!(board_id, error = %source, "Relay board unreachable");
                    (
                        StatusCode::BAD_GATEWAY,
                        "HARDWARE_UNREACHABLE",
                        err.to_string(),
                    )
                }
                BoardError::Store(store) => internal(store),
            },

            // --- Equipment locks ---
            AppError::Lock(err) => match err {
                LockError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                LockError::AlreadyLocked { .. } => {
                    (StatusCode::CONFLICT, "ALREADY_LOCKED", err.to_string())
                }
                LockError::NotAuthorized(_) => {
                    (StatusCode::FORBIDDEN, "NOT_AUTHORIZED", err.to_string())
                }
                LockError::InvalidSettings(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                LockError::Store(store) => internal(store),
            },

            // --- Serial sessions ---
            AppError::Serial(err) => match err {
                SerialError::PortUnavailable { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PORT_UNAVAILABLE",
                    err.to_string(),
                ),
                SerialError::Io(_) => internal(err),
            },

            AppError::Store(err) => internal(err),
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", core.to_string()),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
    }
}

/// Log the real cause and hand the client a sanitised 500.
fn internal(cause: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %cause, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => internal(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_boards::HardwareError;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn board_errors_map_to_statuses() {
        assert_eq!(status_of(BoardError::BoardNotFound(7)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(BoardError::InvalidRelayIndex { index: 9, total: 8 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BoardError::HardwareUnreachable {
                board_id: 1,
                source: HardwareError::Status(500),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn lock_errors_map_to_statuses() {
        assert_eq!(
            status_of(LockError::AlreadyLocked {
                owner_email: Some("alice@lab.local".into())
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LockError::NotAuthorized("not yours".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(LockError::NotFound(3)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(LockError::Store(StoreError::Backend("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn serial_port_unavailable_is_503() {
        assert_eq!(
            status_of(SerialError::PortUnavailable {
                device: "/dev/ttyUSB9".into(),
                reason: "missing".into(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
