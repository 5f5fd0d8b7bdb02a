use chrono::{Duration, Utc};
use relay_core::types::DbId;
use relay_db::repositories::{BoardRepo, EquipmentRepo, SettingsRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

async fn insert_user(pool: &PgPool, email: &str, role: &str) -> DbId {
    let row: (DbId,) = sqlx::query_as("INSERT INTO users (email, role) VALUES ($1, $2) RETURNING id")
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

async fn insert_board(pool: &PgPool, ip: &str) -> DbId {
    let row: (DbId,) = sqlx::query_as(
        "INSERT INTO relay_boards (name, ip_address, total_relays, relay_state) \
         VALUES ('bench', $1, 8, '00000000') RETURNING id",
    )
    .bind(ip)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

async fn insert_equipment(pool: &PgPool, board_id: DbId, start: i32, count: i32) -> DbId {
    let row: (DbId,) = sqlx::query_as(
        "INSERT INTO equipment (name, board_id, start_relay, relay_count) \
         VALUES ('dut', $1, $2, $3) RETURNING id",
    )
    .bind(board_id)
    .bind(start)
    .bind(count)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

// ---------------------------------------------------------------------------
// Lock transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_user_cannot_take_active_lock(pool: PgPool) {
    let alice = insert_user(&pool, "alice@example.com", "user").await;
    let bob = insert_user(&pool, "bob@example.com", "user").await;
    let board = insert_board(&pool, "10.0.0.1").await;
    let eq = insert_equipment(&pool, board, 1, 2).await;
    let now = Utc::now();

    let row = EquipmentRepo::try_lock(&pool, eq, alice, now, now + Duration::minutes(30), false)
        .await
        .unwrap()
        .expect("alice should get the lock");
    assert_eq!(row.locked_by_id, Some(alice));
    assert_eq!(row.holder_email.as_deref(), Some("alice@example.com"));

    let denied = EquipmentRepo::try_lock(&pool, eq, bob, now, now + Duration::minutes(30), false)
        .await
        .unwrap();
    assert!(denied.is_none());

    let lock = EquipmentRepo::find_lock(&pool, eq).await.unwrap().unwrap();
    assert_eq!(lock.locked_by_id, Some(alice));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_lock_can_be_taken_over(pool: PgPool) {
    let alice = insert_user(&pool, "alice@example.com", "user").await;
    let bob = insert_user(&pool, "bob@example.com", "user").await;
    let board = insert_board(&pool, "10.0.0.2").await;
    let eq = insert_equipment(&pool, board, 1, 1).await;
    let earlier = Utc::now() - Duration::hours(1);

    EquipmentRepo::try_lock(&pool, eq, alice, earlier, earlier + Duration::minutes(30), false)
        .await
        .unwrap()
        .unwrap();

    let now = Utc::now();
    let row = EquipmentRepo::try_lock(&pool, eq, bob, now, now + Duration::minutes(30), false)
        .await
        .unwrap()
        .expect("expired lease should be claimable");
    assert_eq!(row.locked_by_id, Some(bob));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_renew_and_unlock_require_owner(pool: PgPool) {
    let alice = insert_user(&pool, "alice@example.com", "user").await;
    let bob = insert_user(&pool, "bob@example.com", "user").await;
    let board = insert_board(&pool, "10.0.0.3").await;
    let eq = insert_equipment(&pool, board, 3, 2).await;
    let now = Utc::now();

    EquipmentRepo::try_lock(&pool, eq, alice, now, now + Duration::minutes(30), false)
        .await
        .unwrap()
        .unwrap();

    let not_renewed = EquipmentRepo::renew_lock(&pool, eq, bob, now + Duration::minutes(60))
        .await
        .unwrap();
    assert!(not_renewed.is_none());

    assert_eq!(EquipmentRepo::unlock(&pool, eq, bob, false).await.unwrap(), 0);
    assert_eq!(EquipmentRepo::unlock(&pool, eq, alice, false).await.unwrap(), 1);

    let lock = EquipmentRepo::find_lock(&pool, eq).await.unwrap().unwrap();
    assert!(lock.locked_by_id.is_none());
    assert!(lock.lock_expires_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clear_expired_is_guarded_by_observed_expiry(pool: PgPool) {
    let alice = insert_user(&pool, "alice@example.com", "user").await;
    let board = insert_board(&pool, "10.0.0.4").await;
    let eq = insert_equipment(&pool, board, 1, 1).await;
    let earlier = Utc::now() - Duration::hours(1);
    let stale_expiry = earlier + Duration::minutes(30);

    let row = EquipmentRepo::try_lock(&pool, eq, alice, earlier, stale_expiry, false)
        .await
        .unwrap()
        .unwrap();
    let observed = row.lock_expires_at.unwrap();
    let now = Utc::now();

    assert_eq!(EquipmentRepo::clear_expired(&pool, eq, observed, now).await.unwrap(), 1);
    assert_eq!(EquipmentRepo::clear_expired(&pool, eq, observed, now).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clear_expired_judges_expiry_by_the_callers_clock(pool: PgPool) {
    let alice = insert_user(&pool, "alice@example.com", "user").await;
    let board = insert_board(&pool, "10.0.0.5").await;
    let eq = insert_equipment(&pool, board, 1, 1).await;
    // A lease that is still running by the database clock.
    let now = Utc::now();
    let expiry = now + Duration::minutes(2);
    EquipmentRepo::try_lock(&pool, eq, alice, now, expiry, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(EquipmentRepo::clear_expired(&pool, eq, expiry, now).await.unwrap(), 0);

    let app_clock_ahead = now + Duration::minutes(3);
    assert_eq!(
        EquipmentRepo::clear_expired(&pool, eq, expiry, app_clock_ahead).await.unwrap(),
        1
    );
}

// ---------------------------------------------------------------------------
// Placement and settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_on_relay_uses_inclusive_range(pool: PgPool) {
    let board = insert_board(&pool, "10.0.0.5").await;
    let eq = insert_equipment(&pool, board, 3, 2).await;

    assert_eq!(EquipmentRepo::find_on_relay(&pool, board, 3).await.unwrap(), Some(eq));
    assert_eq!(EquipmentRepo::find_on_relay(&pool, board, 4).await.unwrap(), Some(eq));
    assert_eq!(EquipmentRepo::find_on_relay(&pool, board, 5).await.unwrap(), None);

    let placements = EquipmentRepo::list_placements(&pool, board).await.unwrap();
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].range().end(), 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_relay_state_overwrite(pool: PgPool) {
    let board = insert_board(&pool, "10.0.0.6").await;
    assert_eq!(BoardRepo::update_relay_state(&pool, board, "10000001").await.unwrap(), 1);

    let row = BoardRepo::find_by_id(&pool, board).await.unwrap().unwrap();
    assert_eq!(row.into_board().relay_state.as_str(), "10000001");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_settings_default_and_update(pool: PgPool) {
    let row = SettingsRepo::get_or_create(&pool).await.unwrap();
    assert_eq!(row.lock_timeout_mins, 30);
    assert_eq!(row.warning_before_mins, 5);

    let row = SettingsRepo::upsert_lock_window(&pool, 60, 10).await.unwrap();
    assert_eq!(row.lock_timeout_mins, 60);
    assert_eq!(row.warning_before_mins, 10);
}
