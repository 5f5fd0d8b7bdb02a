/// Row ids of boards, equipment and users (PostgreSQL BIGSERIAL).
pub type DbId = i64;

/// Lock timestamps and sweep times, always UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
