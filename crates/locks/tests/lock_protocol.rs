use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use relay_core::actor::Actor;
use relay_core::lock::{EquipmentLock, LockClaim, LockHolder, LockSettings};
use relay_core::occupancy::RelayRange;
use relay_core::ports::{EquipmentLockStore, SettingsStore, StoreError};
use relay_core::types::{DbId, Timestamp};
use relay_events::ChangeBus;
use relay_locks::{EquipmentLockService, LockError, RenewOutcome};

// ---------------------------------------------------------------------------
// In-memory store with the same conditional-update semantics as PostgreSQL
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Row {
    board_id: DbId,
    range: RelayRange,
    locked_by_id: Option<DbId>,
    locked_at: Option<Timestamp>,
    lock_expires_at: Option<Timestamp>,
}

#[derive(Default)]
struct MemoryLocks {
    rows: Mutex<HashMap<DbId, Row>>,
    users: HashMap<DbId, String>,
    calls: AtomicUsize,
}

impl MemoryLocks {
    fn new() -> Self {
        let users = [(1, "admin@example.com"), (2, "alice@example.com"), (3, "bob@example.com")]
            .into_iter()
            .map(|(id, email)| (id, email.to_string()))
            .collect();
        Self {
            users,
            ..Default::default()
        }
    }

    fn with_equipment(self, id: DbId, board_id: DbId, start: i32, count: i32) -> Self {
        self.rows.lock().unwrap().insert(
            id,
            Row {
                board_id,
                range: RelayRange::new(start, count),
                locked_by_id: None,
                locked_at: None,
                lock_expires_at: None,
            },
        );
        self
    }

    fn set_lock(&self, id: DbId, user_id: DbId, expires_at: Timestamp) {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).unwrap();
        row.locked_by_id = Some(user_id);
        row.locked_at = Some(expires_at - Duration::minutes(30));
        row.lock_expires_at = Some(expires_at);
    }

    fn to_lock(&self, id: DbId, row: &Row) -> EquipmentLock {
        EquipmentLock {
            equipment_id: id,
            locked_by_id: row.locked_by_id,
            locked_by: row.locked_by_id.map(|uid| LockHolder {
                id: uid,
                email: self.users[&uid].clone(),
                name: None,
            }),
            locked_at: row.locked_at,
            lock_expires_at: row.lock_expires_at,
        }
    }

    fn clear(row: &mut Row) {
        row.locked_by_id = None;
        row.locked_at = None;
        row.lock_expires_at = None;
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EquipmentLockStore for MemoryLocks {
    async fn find_lock(&self, equipment_id: DbId) -> Result<Option<EquipmentLock>, StoreError> {
        self.touch();
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&equipment_id).map(|row| self.to_lock(equipment_id, row)))
    }

    async fn list_held_locks(&self) -> Result<Vec<EquipmentLock>, StoreError> {
        self.touch();
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|(_, row)| row.locked_by_id.is_some())
            .map(|(id, row)| self.to_lock(*id, row))
            .collect())
    }

    async fn try_acquire(&self, claim: &LockClaim) -> Result<Option<EquipmentLock>, StoreError> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&claim.equipment_id) else {
            return Ok(None);
        };
        let allowed = row.locked_by_id.is_none()
            || row.locked_by_id == Some(claim.user_id)
            || row.lock_expires_at.is_some_and(|exp| exp <= claim.now)
            || claim.admin_override;
        if !allowed {
            return Ok(None);
        }
        row.locked_by_id = Some(claim.user_id);
        row.locked_at = Some(claim.now);
        row.lock_expires_at = Some(claim.expires_at);
        let row = row.clone();
        Ok(Some(self.to_lock(claim.equipment_id, &row)))
    }

    async fn extend(
        &self,
        equipment_id: DbId,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<EquipmentLock>, StoreError> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&equipment_id) {
            Some(row) if row.locked_by_id == Some(user_id) => {
                row.lock_expires_at = Some(expires_at);
                let row = row.clone();
                Ok(Some(self.to_lock(equipment_id, &row)))
            }
            _ => Ok(None),
        }
    }

    async fn release(&self, equipment_id: DbId, user_id: DbId, admin_override: bool) -> Result<u64, StoreError> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&equipment_id) {
            Some(row)
                if row.locked_by_id == Some(user_id) || (admin_override && row.locked_by_id.is_some()) =>
            {
                Self::clear(row);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn force_release(&self, equipment_id: DbId) -> Result<u64, StoreError> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&equipment_id) {
            Some(row) => {
                Self::clear(row);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn clear_expired(
        &self,
        equipment_id: DbId,
        observed_expiry: Timestamp,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        self.touch();
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&equipment_id) {
            Some(row)
                if row.locked_by_id.is_some()
                    && row.lock_expires_at == Some(observed_expiry)
                    && observed_expiry <= now =>
            {
                Self::clear(row);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn find_equipment_on_relay(&self, board_id: DbId, relay_number: i32) -> Result<Option<DbId>, StoreError> {
        self.touch();
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|(_, row)| row.board_id == board_id && row.range.contains(relay_number))
            .map(|(id, _)| *id))
    }
}

#[derive(Default)]
struct MemorySettings {
    settings: Mutex<LockSettings>,
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn lock_settings(&self) -> Result<LockSettings, StoreError> {
        Ok(*self.settings.lock().unwrap())
    }

    async fn update_lock_settings(&self, settings: &LockSettings) -> Result<LockSettings, StoreError> {
        *self.settings.lock().unwrap() = *settings;
        Ok(*settings)
    }
}

const ADMIN: Actor = Actor { user_id: 1, is_admin: true };
const ALICE: Actor = Actor { user_id: 2, is_admin: false };
const BOB: Actor = Actor { user_id: 3, is_admin: false };

struct Harness {
    service: Arc<EquipmentLockService>,
    store: Arc<MemoryLocks>,
    bus: Arc<ChangeBus>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryLocks::new().with_equipment(10, 1, 1, 2).with_equipment(11, 1, 3, 2));
    let bus = Arc::new(ChangeBus::default());
    let service = Arc::new(EquipmentLockService::new(
        store.clone(),
        Arc::new(MemorySettings::default()),
        bus.clone(),
    ));
    Harness { service, store, bus }
}

// ---------------------------------------------------------------------------
// lock / renew
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lock_is_idempotent_for_owner() {
    let h = harness();

    let first = h.service.lock(10, &ALICE).await.unwrap();
    let second = h.service.lock(10, &ALICE).await.unwrap();

    assert_eq!(second.locked_by_id, Some(ALICE.user_id));
    assert!(second.lock_expires_at.unwrap() >= first.lock_expires_at.unwrap());
    let lease = second.lock_expires_at.unwrap() - Utc::now();
    assert!(lease > Duration::minutes(29) && lease <= Duration::minutes(30));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lock_has_exactly_one_winner() {
    for _ in 0..50 {
        let h = harness();
        let a = {
            let service = h.service.clone();
            tokio::spawn(async move { service.lock(10, &ALICE).await })
        };
        let b = {
            let service = h.service.clone();
            tokio::spawn(async move { service.lock(10, &BOB).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        match (a, b) {
            (Ok(lock), Err(LockError::AlreadyLocked { owner_email })) => {
                assert_eq!(lock.locked_by_id, Some(ALICE.user_id));
                assert_eq!(owner_email.as_deref(), Some("alice@example.com"));
            }
            (Err(LockError::AlreadyLocked { owner_email }), Ok(lock)) => {
                assert_eq!(lock.locked_by_id, Some(BOB.user_id));
                assert_eq!(owner_email.as_deref(), Some("bob@example.com"));
            }
            other => panic!("expected exactly one winner, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn admin_preempts_active_lock() {
    let h = harness();
    h.service.lock(10, &ALICE).await.unwrap();

    let lock = h.service.lock(10, &ADMIN).await.unwrap();
    assert_eq!(lock.locked_by_id, Some(ADMIN.user_id));
}

#[tokio::test]
async fn expired_lease_can_be_taken() {
    let h = harness();
    h.store.set_lock(10, ALICE.user_id, Utc::now() - Duration::seconds(1));

    let lock = h.service.lock(10, &BOB).await.unwrap();
    assert_eq!(lock.locked_by_id, Some(BOB.user_id));
}

#[tokio::test]
async fn lock_unknown_equipment_is_not_found() {
    let h = harness();
    assert_matches!(h.service.lock(99, &ALICE).await, Err(LockError::NotFound(99)));
}

#[tokio::test]
async fn renew_reports_lost_lock_without_error() {
    let h = harness();
    h.service.lock(10, &ALICE).await.unwrap();

    assert_matches!(h.service.renew(10, &ALICE).await, Ok(RenewOutcome::Renewed(_)));
    assert_matches!(h.service.renew(10, &BOB).await, Ok(RenewOutcome::Lost));
    assert_matches!(h.service.renew(11, &ALICE).await, Ok(RenewOutcome::Lost));
}

// ---------------------------------------------------------------------------
// unlock / force_unlock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn only_owner_or_admin_unlocks() {
    let h = harness();
    h.service.lock(10, &ALICE).await.unwrap();

    assert_matches!(h.service.unlock(10, &BOB).await, Err(LockError::NotAuthorized(_)));
    h.service.unlock(10, &ALICE).await.unwrap();

    // Nothing held any more: even the former owner gets NotAuthorized.
    assert_matches!(h.service.unlock(10, &ALICE).await, Err(LockError::NotAuthorized(_)));

    h.service.lock(10, &BOB).await.unwrap();
    h.service.unlock(10, &ADMIN).await.unwrap();
    let status = h.service.get_status(10, &BOB).await.unwrap();
    assert!(!status.is_locked);
}

#[tokio::test]
async fn force_unlock_checks_role_before_store() {
    let h = harness();
    h.service.lock(10, &ALICE).await.unwrap();
    let calls_before = h.store.calls.load(Ordering::SeqCst);

    assert_matches!(h.service.force_unlock(10, &BOB).await, Err(LockError::NotAuthorized(_)));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), calls_before);

    let mut rx = h.bus.subscribe_lock();
    h.service.force_unlock(10, &ADMIN).await.unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.equipment_id, 10);
    assert!(event.locked_by_id.is_none());
}

// ---------------------------------------------------------------------------
// get_status and lazy expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_lock_is_cleared_once() {
    let h = harness();
    h.store.set_lock(10, ALICE.user_id, Utc::now() - Duration::minutes(1));
    let mut rx = h.bus.subscribe_lock();

    for _ in 0..3 {
        let status = h.service.get_status(10, &BOB).await.unwrap();
        assert!(!status.is_locked);
        assert!(status.can_control);
        assert!(status.locked_by.is_none());
    }

    let event = rx.recv().await.unwrap();
    assert_eq!(event.equipment_id, 10);
    assert!(event.locked_by_id.is_none());
    assert!(rx.try_recv().is_err(), "clear must be announced exactly once");
}

#[tokio::test]
async fn status_reflects_caller() {
    let h = harness();
    h.service.lock(10, &ALICE).await.unwrap();

    let owner = h.service.get_status(10, &ALICE).await.unwrap();
    assert!(owner.is_locked && owner.is_owner && owner.can_control);
    assert_eq!(owner.warning_before_mins, 5);

    let other = h.service.get_status(10, &BOB).await.unwrap();
    assert!(other.is_locked && !other.is_owner && !other.can_control);
    assert_eq!(other.locked_by.unwrap().email, "alice@example.com");

    let admin = h.service.get_status(10, &ADMIN).await.unwrap();
    assert!(admin.can_control && !admin.is_owner);
}

#[tokio::test]
async fn every_transition_publishes() {
    let h = harness();
    let mut rx = h.bus.subscribe_lock();

    h.service.lock(10, &ALICE).await.unwrap();
    h.service.renew(10, &ALICE).await.unwrap();
    h.service.unlock(10, &ALICE).await.unwrap();

    let locked = rx.recv().await.unwrap();
    assert_eq!(locked.locked_by_id, Some(ALICE.user_id));
    let renewed = rx.recv().await.unwrap();
    assert!(renewed.lock_expires_at >= locked.lock_expires_at);
    let released = rx.recv().await.unwrap();
    assert!(released.locked_by_id.is_none());
}

#[tokio::test]
async fn active_locks_skip_stale_entries() {
    let h = harness();
    h.service.lock(10, &ALICE).await.unwrap();
    h.store.set_lock(11, BOB.user_id, Utc::now() - Duration::seconds(5));

    let active = h.service.active_locks().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].equipment_id, 10);
}

// ---------------------------------------------------------------------------
// Relay guard and settings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relay_control_respects_foreign_locks() {
    let h = harness();
    h.service.lock(11, &ALICE).await.unwrap();

    // Equipment 11 covers relays 3..=4, i.e. indices 2 and 3.
    assert_matches!(
        h.service.ensure_relay_control(1, 2, &BOB).await,
        Err(LockError::AlreadyLocked { .. })
    );
    h.service.ensure_relay_control(1, 3, &ALICE).await.unwrap();
    h.service.ensure_relay_control(1, 3, &ADMIN).await.unwrap();
    // Relay 1 belongs to unlocked equipment 10; relay 6 to nothing.
    h.service.ensure_relay_control(1, 0, &BOB).await.unwrap();
    h.service.ensure_relay_control(1, 5, &BOB).await.unwrap();
}

#[tokio::test]
async fn settings_update_is_admin_only_and_validated() {
    let h = harness();
    let wanted = LockSettings {
        lock_timeout_mins: 60,
        warning_before_mins: 10,
    };

    assert_matches!(
        h.service.update_settings(wanted, &ALICE).await,
        Err(LockError::NotAuthorized(_))
    );
    assert_matches!(
        h.service
            .update_settings(
                LockSettings {
                    lock_timeout_mins: 10,
                    warning_before_mins: 10,
                },
                &ADMIN,
            )
            .await,
        Err(LockError::InvalidSettings(_))
    );

    assert_eq!(h.service.update_settings(wanted, &ADMIN).await.unwrap(), wanted);
    assert_eq!(h.service.settings().await.unwrap(), wanted);

    let lock = h.service.lock(10, &ALICE).await.unwrap();
    let lease = lock.lock_expires_at.unwrap() - Utc::now();
    assert!(lease > Duration::minutes(59));
}
