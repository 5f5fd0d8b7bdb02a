//! Errors every layer can raise without knowing about HTTP.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// `entity` is the display name of the thing looked up, e.g. `"Board"`.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input that cannot succeed as sent: a bad relay state string, lock
    /// settings out of range, a missing query parameter.
    #[error("{0}")]
    Validation(String),

    /// No usable credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Credentials are fine; the role is not.
    #[error("{0}")]
    Forbidden(String),
}
