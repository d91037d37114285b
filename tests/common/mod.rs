#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use meetbook::database::{activity_repo, card_repo, schema, user_repo};
use meetbook::models::day::fmt_ts;
use meetbook::models::ActivityRow;
use meetbook::services::slot_service::{self, SlotSpec};

/// Calendar day all test slots live on.
pub const DAY: &str = "2030-06-01";

/// In-memory database. One connection, otherwise every pooled connection
/// would see its own empty :memory: database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    schema::ensure_schema(&pool).await.expect("schema");
    pool
}

/// Wall-clock moment on `DAY`.
pub fn t(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, hour, minute, 0).unwrap()
}

/// A moment comfortably before any slot on `DAY` opens.
pub fn day_before() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 30, 12, 0, 0).unwrap()
}

pub fn free_activity(activity_id: &str) -> ActivityRow {
    ActivityRow {
        activity_id: activity_id.to_string(),
        title: format!("activity {activity_id}"),
        status: "active".to_string(),
        cancel_limited: 0,
        cancel_days: 0,
        cancel_hours: 0,
        cancel_minutes: 0,
        cost_enabled: 0,
        cost_mode: "free".to_string(),
        count_cost: 0,
        balance_cost: 0,
        allow_auto_select: 1,
        open_days_json: "[]".to_string(),
        form_schema_json: "[]".to_string(),
    }
}

pub fn count_activity(activity_id: &str, count_cost: i64) -> ActivityRow {
    let mut row = free_activity(activity_id);
    row.cost_enabled = 1;
    row.cost_mode = "count".to_string();
    row.count_cost = count_cost;
    row
}

pub async fn seed_activity(pool: &SqlitePool, row: &ActivityRow) {
    activity_repo::upsert_activity(pool, row).await.expect("seed activity");
}

/// One open 09:00-10:00 slot on `DAY`; returns its mark.
pub async fn seed_slot(pool: &SqlitePool, activity_id: &str, limit: Option<i64>) -> String {
    let spec = SlotSpec {
        start: "09:00".to_string(),
        end: "10:00".to_string(),
        is_open: true,
        is_limited: limit.is_some(),
        limit: limit.unwrap_or(0),
    };
    let slots = slot_service::replace_day_slots(pool, activity_id, DAY, vec![spec], day_before())
        .await
        .expect("seed slot");
    slots[0].mark.clone()
}

/// Several open one-hour slots starting on the hour from 09:00.
pub async fn seed_slots(pool: &SqlitePool, activity_id: &str, count: u32) -> Vec<String> {
    let specs = (0..count)
        .map(|i| SlotSpec {
            start: format!("{:02}:00", 9 + i),
            end: format!("{:02}:00", 10 + i),
            is_open: true,
            is_limited: false,
            limit: 0,
        })
        .collect();
    let slots = slot_service::replace_day_slots(pool, activity_id, DAY, specs, day_before())
        .await
        .expect("seed slots");
    slots.into_iter().map(|slot| slot.mark).collect()
}

pub async fn seed_card(
    pool: &SqlitePool,
    card_id: &str,
    user_id: &str,
    kind: &str,
    total: i64,
    expires_at: Option<&str>,
) {
    card_repo::insert_card(pool, card_id, user_id, kind, total, expires_at, &fmt_ts(day_before()))
        .await
        .expect("seed card");
}

pub async fn seed_user(pool: &SqlitePool, user_id: &str, display_name: &str) {
    user_repo::upsert_user(pool, user_id, display_name)
        .await
        .expect("seed user");
}
