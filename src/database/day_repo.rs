use sqlx::SqlitePool;

use crate::models::DayRow;

const SQL_GET_DAY: &str = r#"
SELECT activity_id, day, slots_json
FROM activity_days
WHERE activity_id = ?1 AND day = ?2
LIMIT 1
"#;

pub async fn get_day(
    pool: &SqlitePool,
    activity_id: &str,
    day: &str,
) -> sqlx::Result<Option<DayRow>> {
    sqlx::query_as::<_, DayRow>(SQL_GET_DAY)
        .bind(activity_id)
        .bind(day)
        .fetch_optional(pool)
        .await
}

const SQL_LIST_DAYS: &str = r#"
SELECT activity_id, day, slots_json
FROM activity_days
WHERE activity_id = ?1
ORDER BY day ASC
"#;

pub async fn list_days(pool: &SqlitePool, activity_id: &str) -> sqlx::Result<Vec<DayRow>> {
    sqlx::query_as::<_, DayRow>(SQL_LIST_DAYS)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_UPSERT_DAY: &str = r#"
INSERT INTO activity_days (activity_id, day, slots_json)
VALUES (?1, ?2, ?3)
ON CONFLICT (activity_id, day) DO UPDATE SET slots_json = excluded.slots_json
"#;

pub async fn upsert_day(
    pool: &SqlitePool,
    activity_id: &str,
    day: &str,
    slots_json: &str,
) -> sqlx::Result<()> {
    sqlx::query(SQL_UPSERT_DAY)
        .bind(activity_id)
        .bind(day)
        .bind(slots_json)
        .execute(pool)
        .await?;
    Ok(())
}
