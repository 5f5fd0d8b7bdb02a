use crate::roles::ROLE_ADMIN;
use crate::types::DbId;

/// The user on whose behalf a lock or relay operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(user_id: DbId, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }

    /// Build an actor from a role name carried in an access token.
    pub fn from_role(user_id: DbId, role: &str) -> Self {
        Self::new(user_id, role == ROLE_ADMIN)
    }
}
