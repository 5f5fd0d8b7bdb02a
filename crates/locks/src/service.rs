//! Lease-based exclusive locks on equipment.
//!
//! State per equipment is `Unlocked` or `Locked(owner, expires_at)`. Every
//! transition is a single conditional update in the store; the service
//! turns the returned row or affected-row count into the domain outcome and
//! never reads-then-writes. A lock whose expiry has passed reads as
//! unlocked everywhere and is cleared by the next `get_status` that sees it.

use std::sync::Arc;

use chrono::Utc;
use relay_core::actor::Actor;
use relay_core::error::CoreError;
use relay_core::lock::{EquipmentLock, LockClaim, LockSettings, LockStatus};
use relay_core::ports::{EquipmentLockStore, SettingsStore, StoreError};
use relay_core::types::DbId;
use relay_events::{ChangeBus, LockChanged};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Equipment {0} not found")]
    NotFound(DbId),

    #[error("Equipment is locked by {}", .owner_email.as_deref().unwrap_or("another user"))]
    AlreadyLocked { owner_email: Option<String> },

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Invalid lock settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a renewal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewOutcome {
    /// The caller still held the lock; its expiry moved forward.
    Renewed(EquipmentLock),
    /// The lock expired or changed hands before the renewal landed.
    Lost,
}

/// The equipment lock state machine.
pub struct EquipmentLockService {
    locks: Arc<dyn EquipmentLockStore>,
    settings: Arc<dyn SettingsStore>,
    bus: Arc<ChangeBus>,
}

impl EquipmentLockService {
    pub fn new(locks: Arc<dyn EquipmentLockStore>, settings: Arc<dyn SettingsStore>, bus: Arc<ChangeBus>) -> Self {
        Self { locks, settings, bus }
    }

    /// Take (or re-take) the lock for `actor`.
    ///
    /// Succeeds when the equipment is unlocked, its lease has expired, the
    /// caller already owns it, or the caller is an administrator.
    pub async fn lock(&self, equipment_id: DbId, actor: &Actor) -> Result<EquipmentLock, LockError> {
        let settings = self.settings.lock_settings().await?;
        let now = Utc::now();
        let claim = LockClaim {
            equipment_id,
            user_id: actor.user_id,
            now,
            expires_at: now + settings.lease(),
            admin_override: actor.is_admin,
        };

        if let Some(lock) = self.locks.try_acquire(&claim).await? {
            tracing::info!(equipment_id, user_id = actor.user_id, expires_at = %claim.expires_at, "Equipment locked");
            self.bus.publish_lock(LockChanged::from(&lock));
            return Ok(lock);
        }

        // The guard rejected the claim; report who holds it.
        let current = self
            .locks
            .find_lock(equipment_id)
            .await?
            .ok_or(LockError::NotFound(equipment_id))?;
        Err(LockError::AlreadyLocked {
            owner_email: current.locked_by.map(|holder| holder.email),
        })
    }

    /// Extend the caller's lease. Losing the lock is an outcome, not an error.
    pub async fn renew(&self, equipment_id: DbId, actor: &Actor) -> Result<RenewOutcome, LockError> {
        let settings = self.settings.lock_settings().await?;
        let expires_at = Utc::now() + settings.lease();

        match self.locks.extend(equipment_id, actor.user_id, expires_at).await? {
            Some(lock) => {
                tracing::debug!(equipment_id, user_id = actor.user_id, %expires_at, "Equipment lock renewed");
                self.bus.publish_lock(LockChanged::from(&lock));
                Ok(RenewOutcome::Renewed(lock))
            }
            None => Ok(RenewOutcome::Lost),
        }
    }

    /// Release a lock the caller owns (administrators may release any).
    pub async fn unlock(&self, equipment_id: DbId, actor: &Actor) -> Result<(), LockError> {
        let rows = self
            .locks
            .release(equipment_id, actor.user_id, actor.is_admin)
            .await?;

        if rows == 0 {
            return match self.locks.find_lock(equipment_id).await? {
                None => Err(LockError::NotFound(equipment_id)),
                Some(_) => Err(LockError::NotAuthorized(
                    "you do not hold the lock on this equipment".to_string(),
                )),
            };
        }

        tracing::info!(equipment_id, user_id = actor.user_id, "Equipment unlocked");
        self.bus.publish_lock(LockChanged::released(equipment_id));
        Ok(())
    }

    /// Clear the lock unconditionally. Administrators only.
    pub async fn force_unlock(&self, equipment_id: DbId, actor: &Actor) -> Result<(), LockError> {
        if !actor.is_admin {
            return Err(LockError::NotAuthorized(
                "only administrators can force-release a lock".to_string(),
            ));
        }

        if self.locks.force_release(equipment_id).await? == 0 {
            return Err(LockError::NotFound(equipment_id));
        }

        tracing::warn!(equipment_id, admin_id = actor.user_id, "Equipment lock force-released");
        self.bus.publish_lock(LockChanged::released(equipment_id));
        Ok(())
    }

    /// The lock as seen by `actor`, clearing it first if it has expired.
    pub async fn get_status(&self, equipment_id: DbId, actor: &Actor) -> Result<LockStatus, LockError> {
        let settings = self.settings.lock_settings().await?;
        let now = Utc::now();
        let mut lock = self
            .locks
            .find_lock(equipment_id)
            .await?
            .ok_or(LockError::NotFound(equipment_id))?;

        if lock.is_stale(now) {
            if let Some(observed) = lock.lock_expires_at {
                // Only the caller whose update lands announces the clear.
                if self.locks.clear_expired(equipment_id, observed, now).await? == 1 {
                    tracing::info!(equipment_id, "Expired equipment lock cleared");
                    self.bus.publish_lock(LockChanged::released(equipment_id));
                }
            }
            lock = EquipmentLock::unlocked(equipment_id);
        }

        Ok(LockStatus::evaluate(&lock, actor, &settings, now))
    }

    /// Every currently active (non-expired) lock.
    pub async fn active_locks(&self) -> Result<Vec<EquipmentLock>, LockError> {
        let now = Utc::now();
        let held = self.locks.list_held_locks().await?;
        Ok(held.into_iter().filter(|lock| lock.is_active(now)).collect())
    }

    /// Refuse to operate relay `relay_index` (0-based) of `board_id` when it
    /// belongs to equipment actively locked by someone else.
    pub async fn ensure_relay_control(&self, board_id: DbId, relay_index: i64, actor: &Actor) -> Result<(), LockError> {
        if actor.is_admin {
            return Ok(());
        }
        let Some(relay_number) = relay_index.checked_add(1).and_then(|n| i32::try_from(n).ok()) else {
            return Ok(());
        };
        let Some(equipment_id) = self.locks.find_equipment_on_relay(board_id, relay_number).await? else {
            return Ok(());
        };
        let Some(lock) = self.locks.find_lock(equipment_id).await? else {
            return Ok(());
        };

        if lock.is_active(Utc::now()) && !lock.is_held_by(actor.user_id) {
            return Err(LockError::AlreadyLocked {
                owner_email: lock.locked_by.map(|holder| holder.email),
            });
        }
        Ok(())
    }

    pub async fn settings(&self) -> Result<LockSettings, LockError> {
        Ok(self.settings.lock_settings().await?)
    }

    /// Replace the lease parameters. Administrators only.
    pub async fn update_settings(&self, settings: LockSettings, actor: &Actor) -> Result<LockSettings, LockError> {
        if !actor.is_admin {
            return Err(LockError::NotAuthorized(
                "only administrators can change lock settings".to_string(),
            ));
        }
        settings.validate().map_err(|e| match e {
            CoreError::Validation(msg) => LockError::InvalidSettings(msg),
            other => LockError::InvalidSettings(other.to_string()),
        })?;

        let saved = self.settings.update_lock_settings(&settings).await?;
        tracing::info!(
            lock_timeout_mins = saved.lock_timeout_mins,
            warning_before_mins = saved.warning_before_mins,
            "Lock settings updated",
        );
        Ok(saved)
    }
}
