use sqlx::SqlitePool;

const SQL_UPSERT_USER: &str = r#"
INSERT INTO users (user_id, display_name)
VALUES (?1, ?2)
ON CONFLICT (user_id) DO UPDATE SET display_name = excluded.display_name
"#;

pub async fn upsert_user(pool: &SqlitePool, user_id: &str, display_name: &str) -> sqlx::Result<()> {
    sqlx::query(SQL_UPSERT_USER)
        .bind(user_id)
        .bind(display_name)
        .execute(pool)
        .await?;
    Ok(())
}
