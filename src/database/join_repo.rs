use sqlx::SqlitePool;

use crate::models::{JoinRow, SlotStats};

const JOIN_COLUMNS: &str = r#"
  join_id,
  activity_id,
  user_id,
  day,
  slot_mark,
  start_at,
  end_at,
  status,
  checked_in,
  form_json,
  deduction_json,
  created_at,
  cancelled_at,
  cancel_reason
"#;

pub struct NewJoin<'a> {
    pub join_id: &'a str,
    pub activity_id: &'a str,
    pub user_id: &'a str,
    pub day: &'a str,
    pub slot_mark: &'a str,
    pub start_at: &'a str,
    pub end_at: &'a str,
    pub form_json: &'a str,
    pub deduction_json: Option<&'a str>,
    pub created_at: &'a str,
}

// Conditional insert: the per-user uniqueness and the capacity recount are
// evaluated inside the same statement, so concurrent bookings cannot both
// pass a stale pre-check. SQLite serializes writers, which makes the
// embedded recount atomic with the insert.
const SQL_INSERT_JOIN_GUARDED: &str = r#"
INSERT INTO joins (
  join_id, activity_id, user_id, day, slot_mark, start_at, end_at,
  status, checked_in, form_json, deduction_json, created_at
)
SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, 'succeeded', 0, ?8, ?9, ?10
WHERE NOT EXISTS (
    SELECT 1 FROM joins
    WHERE activity_id = ?2 AND user_id = ?3 AND slot_mark = ?5
      AND status = 'succeeded'
  )
  AND (
    ?11 = 0
    OR (
      SELECT COUNT(*) FROM joins
      WHERE activity_id = ?2 AND slot_mark = ?5 AND status = 'succeeded'
    ) < ?12
  )
"#;

/// Returns false when the guard rejected the insert (slot full or the user
/// already holds a live join for this mark).
pub async fn insert_join_guarded(
    pool: &SqlitePool,
    join: NewJoin<'_>,
    capacity_limited: bool,
    capacity_limit: i64,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_INSERT_JOIN_GUARDED)
        .bind(join.join_id)
        .bind(join.activity_id)
        .bind(join.user_id)
        .bind(join.day)
        .bind(join.slot_mark)
        .bind(join.start_at)
        .bind(join.end_at)
        .bind(join.form_json)
        .bind(join.deduction_json)
        .bind(join.created_at)
        .bind(i64::from(capacity_limited))
        .bind(capacity_limit)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn get_join(pool: &SqlitePool, join_id: &str) -> sqlx::Result<Option<JoinRow>> {
    let sql = format!("SELECT {JOIN_COLUMNS} FROM joins WHERE join_id = ?1 LIMIT 1");
    sqlx::query_as::<_, JoinRow>(&sql)
        .bind(join_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_succeeded(
    pool: &SqlitePool,
    user_id: &str,
    activity_id: &str,
    slot_mark: &str,
) -> sqlx::Result<Option<JoinRow>> {
    let sql = format!(
        r#"
SELECT {JOIN_COLUMNS} FROM joins
WHERE user_id = ?1 AND activity_id = ?2 AND slot_mark = ?3 AND status = 'succeeded'
LIMIT 1
        "#
    );
    sqlx::query_as::<_, JoinRow>(&sql)
        .bind(user_id)
        .bind(activity_id)
        .bind(slot_mark)
        .fetch_optional(pool)
        .await
}

pub async fn find_succeeded_by_mark(
    pool: &SqlitePool,
    user_id: &str,
    slot_mark: &str,
) -> sqlx::Result<Option<JoinRow>> {
    let sql = format!(
        r#"
SELECT {JOIN_COLUMNS} FROM joins
WHERE user_id = ?1 AND slot_mark = ?2 AND status = 'succeeded'
ORDER BY created_at ASC
LIMIT 1
        "#
    );
    sqlx::query_as::<_, JoinRow>(&sql)
        .bind(user_id)
        .bind(slot_mark)
        .fetch_optional(pool)
        .await
}

pub async fn find_latest_for_activity(
    pool: &SqlitePool,
    user_id: &str,
    activity_id: &str,
) -> sqlx::Result<Option<JoinRow>> {
    let sql = format!(
        r#"
SELECT {JOIN_COLUMNS} FROM joins
WHERE user_id = ?1 AND activity_id = ?2
ORDER BY created_at DESC
LIMIT 1
        "#
    );
    sqlx::query_as::<_, JoinRow>(&sql)
        .bind(user_id)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_user_joins(
    pool: &SqlitePool,
    user_id: &str,
    include_cancelled: bool,
) -> sqlx::Result<Vec<JoinRow>> {
    let filter = if include_cancelled {
        ""
    } else {
        "AND status = 'succeeded'"
    };
    let sql = format!(
        r#"
SELECT {JOIN_COLUMNS} FROM joins
WHERE user_id = ?1 {filter}
ORDER BY start_at DESC
        "#
    );
    sqlx::query_as::<_, JoinRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn list_succeeded_by_slot(
    pool: &SqlitePool,
    activity_id: &str,
    slot_mark: &str,
) -> sqlx::Result<Vec<JoinRow>> {
    let sql = format!(
        r#"
SELECT {JOIN_COLUMNS} FROM joins
WHERE activity_id = ?1 AND slot_mark = ?2 AND status = 'succeeded'
ORDER BY created_at ASC
        "#
    );
    sqlx::query_as::<_, JoinRow>(&sql)
        .bind(activity_id)
        .bind(slot_mark)
        .fetch_all(pool)
        .await
}

pub async fn count_succeeded(
    pool: &SqlitePool,
    activity_id: &str,
    slot_mark: &str,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
SELECT COUNT(*) FROM joins
WHERE activity_id = ?1 AND slot_mark = ?2 AND status = 'succeeded'
        "#,
    )
    .bind(activity_id)
    .bind(slot_mark)
    .fetch_one(pool)
    .await
}

/// Fresh per-status recount for one slot mark, read by the stats repair pass.
pub async fn status_counts(
    pool: &SqlitePool,
    activity_id: &str,
    slot_mark: &str,
) -> sqlx::Result<SlotStats> {
    let row: (i64, i64, i64) = sqlx::query_as(
        r#"
SELECT
  COALESCE(SUM(CASE WHEN status = 'succeeded' THEN 1 ELSE 0 END), 0),
  COALESCE(SUM(CASE WHEN status = 'user_cancelled' THEN 1 ELSE 0 END), 0),
  COALESCE(SUM(CASE WHEN status = 'admin_cancelled' THEN 1 ELSE 0 END), 0)
FROM joins
WHERE activity_id = ?1 AND slot_mark = ?2
        "#,
    )
    .bind(activity_id)
    .bind(slot_mark)
    .fetch_one(pool)
    .await?;
    Ok(SlotStats {
        succeeded: row.0,
        user_cancelled: row.1,
        admin_cancelled: row.2,
    })
}

// Guarded on status so a cancel can never fire twice for the same join;
// the cancel also clears the check-in flag.
const SQL_MARK_CANCELLED: &str = r#"
UPDATE joins
SET status = ?2, checked_in = 0, cancelled_at = ?3, cancel_reason = ?4
WHERE join_id = ?1 AND status = 'succeeded'
"#;

pub async fn mark_cancelled(
    pool: &SqlitePool,
    join_id: &str,
    new_status: &str,
    cancelled_at: &str,
    reason: Option<&str>,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_MARK_CANCELLED)
        .bind(join_id)
        .bind(new_status)
        .bind(cancelled_at)
        .bind(reason)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn update_deduction(
    pool: &SqlitePool,
    join_id: &str,
    deduction_json: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE joins SET deduction_json = ?2 WHERE join_id = ?1")
        .bind(join_id)
        .bind(deduction_json)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_checked_in(pool: &SqlitePool, join_id: &str, flag: bool) -> sqlx::Result<bool> {
    let res = sqlx::query("UPDATE joins SET checked_in = ?2 WHERE join_id = ?1 AND status = 'succeeded'")
        .bind(join_id)
        .bind(i64::from(flag))
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

// Storage hygiene: drops the caller's cancelled rows and succeeded rows
// whose end time has passed.
const SQL_DELETE_FINISHED: &str = r#"
DELETE FROM joins
WHERE user_id = ?1
  AND (
    status IN ('user_cancelled', 'admin_cancelled')
    OR (status = 'succeeded' AND end_at <= ?2)
  )
"#;

pub async fn delete_finished(pool: &SqlitePool, user_id: &str, now: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_FINISHED)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

#[derive(Debug, sqlx::FromRow, Clone)]
pub struct CheckinCountRow {
    pub user_id: String,
    pub display_name: Option<String>,
    pub checkin_count: i64,
}

const SQL_CHECKIN_COUNTS_ALL: &str = r#"
SELECT
  j.user_id,
  u.display_name,
  COUNT(*) AS checkin_count
FROM joins j
LEFT JOIN users u ON u.user_id = j.user_id
WHERE j.status = 'succeeded' AND j.checked_in = 1
GROUP BY j.user_id
ORDER BY checkin_count DESC, j.user_id ASC
LIMIT ?1
"#;

const SQL_CHECKIN_COUNTS_SINCE: &str = r#"
SELECT
  j.user_id,
  u.display_name,
  COUNT(*) AS checkin_count
FROM joins j
LEFT JOIN users u ON u.user_id = j.user_id
WHERE j.status = 'succeeded' AND j.checked_in = 1 AND j.day >= ?1
GROUP BY j.user_id
ORDER BY checkin_count DESC, j.user_id ASC
LIMIT ?2
"#;

/// Check-in counts grouped per user, ties broken by user id ascending so
/// the ranking is deterministic.
pub async fn checkin_counts(
    pool: &SqlitePool,
    since_day: Option<&str>,
    limit: i64,
) -> sqlx::Result<Vec<CheckinCountRow>> {
    match since_day {
        Some(since) => {
            sqlx::query_as::<_, CheckinCountRow>(SQL_CHECKIN_COUNTS_SINCE)
                .bind(since)
                .bind(limit)
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query_as::<_, CheckinCountRow>(SQL_CHECKIN_COUNTS_ALL)
                .bind(limit)
                .fetch_all(pool)
                .await
        }
    }
}
