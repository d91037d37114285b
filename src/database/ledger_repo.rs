use sqlx::{SqliteConnection, SqlitePool};

use crate::models::LedgerEntryRow;

pub struct NewLedgerEntry<'a> {
    pub entry_id: &'a str,
    pub card_id: &'a str,
    pub user_id: &'a str,
    pub kind: &'a str,
    pub delta: i64,
    pub remaining_before: i64,
    pub remaining_after: i64,
    pub reason: &'a str,
    pub related_id: Option<&'a str>,
    pub created_at: &'a str,
}

const SQL_INSERT_ENTRY: &str = r#"
INSERT INTO card_ledger (
  entry_id,
  card_id,
  user_id,
  kind,
  delta,
  remaining_before,
  remaining_after,
  reason,
  related_id,
  created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
"#;

pub async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: NewLedgerEntry<'_>,
) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_ENTRY)
        .bind(entry.entry_id)
        .bind(entry.card_id)
        .bind(entry.user_id)
        .bind(entry.kind)
        .bind(entry.delta)
        .bind(entry.remaining_before)
        .bind(entry.remaining_after)
        .bind(entry.reason)
        .bind(entry.related_id)
        .bind(entry.created_at)
        .execute(conn)
        .await?;
    Ok(())
}

const SQL_LIST_ENTRIES: &str = r#"
SELECT
  entry_id,
  card_id,
  user_id,
  kind,
  delta,
  remaining_before,
  remaining_after,
  reason,
  related_id,
  created_at
FROM card_ledger
WHERE card_id = ?1
ORDER BY created_at DESC, rowid DESC
"#;

pub async fn list_entries(pool: &SqlitePool, card_id: &str) -> sqlx::Result<Vec<LedgerEntryRow>> {
    sqlx::query_as::<_, LedgerEntryRow>(SQL_LIST_ENTRIES)
        .bind(card_id)
        .fetch_all(pool)
        .await
}
