use sqlx::SqlitePool;

use crate::models::ActivityRow;

const SQL_GET_ACTIVITY: &str = r#"
SELECT
  activity_id,
  title,
  status,
  cancel_limited,
  cancel_days,
  cancel_hours,
  cancel_minutes,
  cost_enabled,
  cost_mode,
  count_cost,
  balance_cost,
  allow_auto_select,
  open_days_json,
  form_schema_json
FROM activities
WHERE activity_id = ?1
LIMIT 1
"#;

pub async fn get_activity(pool: &SqlitePool, activity_id: &str) -> sqlx::Result<Option<ActivityRow>> {
    sqlx::query_as::<_, ActivityRow>(SQL_GET_ACTIVITY)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

const SQL_UPSERT_ACTIVITY: &str = r#"
INSERT INTO activities (
  activity_id,
  title,
  status,
  cancel_limited,
  cancel_days,
  cancel_hours,
  cancel_minutes,
  cost_enabled,
  cost_mode,
  count_cost,
  balance_cost,
  allow_auto_select,
  open_days_json,
  form_schema_json
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
ON CONFLICT (activity_id) DO UPDATE SET
  title = excluded.title,
  status = excluded.status,
  cancel_limited = excluded.cancel_limited,
  cancel_days = excluded.cancel_days,
  cancel_hours = excluded.cancel_hours,
  cancel_minutes = excluded.cancel_minutes,
  cost_enabled = excluded.cost_enabled,
  cost_mode = excluded.cost_mode,
  count_cost = excluded.count_cost,
  balance_cost = excluded.balance_cost,
  allow_auto_select = excluded.allow_auto_select,
  form_schema_json = excluded.form_schema_json
"#;

pub async fn upsert_activity(pool: &SqlitePool, row: &ActivityRow) -> sqlx::Result<()> {
    sqlx::query(SQL_UPSERT_ACTIVITY)
        .bind(&row.activity_id)
        .bind(&row.title)
        .bind(&row.status)
        .bind(row.cancel_limited)
        .bind(row.cancel_days)
        .bind(row.cancel_hours)
        .bind(row.cancel_minutes)
        .bind(row.cost_enabled)
        .bind(&row.cost_mode)
        .bind(row.count_cost)
        .bind(row.balance_cost)
        .bind(row.allow_auto_select)
        .bind(&row.open_days_json)
        .bind(&row.form_schema_json)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_open_days(
    pool: &SqlitePool,
    activity_id: &str,
    open_days_json: &str,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE activities SET open_days_json = ?2 WHERE activity_id = ?1")
        .bind(activity_id)
        .bind(open_days_json)
        .execute(pool)
        .await?;
    Ok(())
}
