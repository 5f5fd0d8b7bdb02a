//! Equipment lock lease model.
//!
//! Pure logic, no storage access. A lock is *active* while it has an owner
//! and its expiry lies in the future; a lock whose expiry has passed is
//! *stale* and must be treated as absent by every reader.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Default lease length in minutes.
pub const DEFAULT_LOCK_TIMEOUT_MINS: i32 = 30;

/// Default lead time for the expiry warning, in minutes.
pub const DEFAULT_WARNING_BEFORE_MINS: i32 = 5;

/// Shortest lease an administrator may configure.
pub const MIN_LOCK_TIMEOUT_MINS: i32 = 5;

/// Shortest warning lead time an administrator may configure.
pub const MIN_WARNING_BEFORE_MINS: i32 = 1;

// ---------------------------------------------------------------------------
// Lock records
// ---------------------------------------------------------------------------

/// Public identity of a lock holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub id: DbId,
    pub email: String,
    pub name: Option<String>,
}

/// Lock fields of one equipment row.
///
/// `locked_by_id` is `None` exactly when `lock_expires_at` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentLock {
    pub equipment_id: DbId,
    pub locked_by_id: Option<DbId>,
    pub locked_by: Option<LockHolder>,
    pub locked_at: Option<Timestamp>,
    pub lock_expires_at: Option<Timestamp>,
}

impl EquipmentLock {
    /// An unlocked record.
    pub fn unlocked(equipment_id: DbId) -> Self {
        Self {
            equipment_id,
            locked_by_id: None,
            locked_by: None,
            locked_at: None,
            lock_expires_at: None,
        }
    }

    /// Owned and not yet expired.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.locked_by_id.is_some() && self.lock_expires_at.is_some_and(|exp| exp > now)
    }

    /// Owned but expired: must be cleared by whoever observes it.
    pub fn is_stale(&self, now: Timestamp) -> bool {
        self.locked_by_id.is_some() && !self.is_active(now)
    }

    pub fn is_held_by(&self, user_id: DbId) -> bool {
        self.locked_by_id == Some(user_id)
    }
}

/// Parameters of an atomic acquire attempt.
#[derive(Debug, Clone, Copy)]
pub struct LockClaim {
    pub equipment_id: DbId,
    pub user_id: DbId,
    pub now: Timestamp,
    pub expires_at: Timestamp,
    /// Administrators may pre-empt an active lock held by someone else.
    pub admin_override: bool,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime-configurable lease parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSettings {
    pub lock_timeout_mins: i32,
    pub warning_before_mins: i32,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lock_timeout_mins: DEFAULT_LOCK_TIMEOUT_MINS,
            warning_before_mins: DEFAULT_WARNING_BEFORE_MINS,
        }
    }
}

impl LockSettings {
    /// Lease length as a duration.
    pub fn lease(&self) -> Duration {
        Duration::minutes(i64::from(self.lock_timeout_mins))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.lock_timeout_mins < MIN_LOCK_TIMEOUT_MINS {
            return Err(CoreError::Validation(format!(
                "lockTimeoutMins must be at least {MIN_LOCK_TIMEOUT_MINS}"
            )));
        }
        if self.warning_before_mins < MIN_WARNING_BEFORE_MINS {
            return Err(CoreError::Validation(format!(
                "warningBeforeMins must be at least {MIN_WARNING_BEFORE_MINS}"
            )));
        }
        if self.warning_before_mins >= self.lock_timeout_mins {
            return Err(CoreError::Validation(
                "warningBeforeMins must be less than lockTimeoutMins".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Derived status
// ---------------------------------------------------------------------------

/// What a given caller may do with a given equipment right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub is_locked: bool,
    pub locked_by: Option<LockHolder>,
    pub lock_expires_at: Option<Timestamp>,
    pub can_control: bool,
    pub is_owner: bool,
    pub warning_before_mins: i32,
}

impl LockStatus {
    /// Evaluate `lock` from the point of view of `actor` at `now`.
    ///
    /// A stale lock reads exactly like an absent one.
    pub fn evaluate(lock: &EquipmentLock, actor: &Actor, settings: &LockSettings, now: Timestamp) -> Self {
        let is_locked = lock.is_active(now);
        let is_owner = is_locked && lock.is_held_by(actor.user_id);
        Self {
            is_locked,
            locked_by: if is_locked { lock.locked_by.clone() } else { None },
            lock_expires_at: if is_locked { lock.lock_expires_at } else { None },
            can_control: !is_locked || is_owner || actor.is_admin,
            is_owner,
            warning_before_mins: settings.warning_before_mins,
        }
    }

    /// Whether the holder should be prompted to renew: the lease is live and
    /// ends within the warning lead time.
    pub fn should_warn(&self, now: Timestamp) -> bool {
        match (self.is_locked, self.lock_expires_at) {
            (true, Some(expires_at)) => {
                let remaining = expires_at - now;
                remaining > Duration::zero()
                    && remaining <= Duration::minutes(i64::from(self.warning_before_mins))
            }
            _ => false,
        }
    }
}
