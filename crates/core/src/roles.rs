//! Role names carried in access tokens.
//!
//! These must match the seed data in `db/migrations/20250101000001_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
