use sqlx::{SqliteConnection, SqlitePool};

use crate::models::CardRow;

const CARD_COLUMNS: &str = r#"
  card_id,
  user_id,
  kind,
  total,
  used,
  remaining,
  status,
  expires_at,
  created_at
"#;

pub async fn get_card(pool: &SqlitePool, card_id: &str) -> sqlx::Result<Option<CardRow>> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_id = ?1 LIMIT 1");
    sqlx::query_as::<_, CardRow>(&sql)
        .bind(card_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_card_tx(
    conn: &mut SqliteConnection,
    card_id: &str,
) -> sqlx::Result<Option<CardRow>> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_id = ?1 LIMIT 1");
    sqlx::query_as::<_, CardRow>(&sql)
        .bind(card_id)
        .fetch_optional(conn)
        .await
}

pub async fn list_user_cards(pool: &SqlitePool, user_id: &str) -> sqlx::Result<Vec<CardRow>> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE user_id = ?1 ORDER BY created_at ASC, card_id ASC"
    );
    sqlx::query_as::<_, CardRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

const SQL_INSERT_CARD: &str = r#"
INSERT INTO cards (card_id, user_id, kind, total, used, remaining, status, expires_at, created_at)
VALUES (?1, ?2, ?3, ?4, 0, ?4, 'active', ?5, ?6)
"#;

pub async fn insert_card(
    pool: &SqlitePool,
    card_id: &str,
    user_id: &str,
    kind: &str,
    total: i64,
    expires_at: Option<&str>,
    created_at: &str,
) -> sqlx::Result<()> {
    sqlx::query(SQL_INSERT_CARD)
        .bind(card_id)
        .bind(user_id)
        .bind(kind)
        .bind(total)
        .bind(expires_at)
        .bind(created_at)
        .execute(pool)
        .await?;
    Ok(())
}

// Single guarded statement: the `remaining >= amount` condition makes
// concurrent debits on the same card safe without a read-then-write gap.
const SQL_DEBIT_CARD: &str = r#"
UPDATE cards
SET
  used = used + ?2,
  remaining = remaining - ?2,
  status = CASE WHEN remaining - ?2 <= 0 THEN 'depleted' ELSE status END
WHERE card_id = ?1 AND status = 'active' AND remaining >= ?2
"#;

pub async fn debit_card(
    conn: &mut SqliteConnection,
    card_id: &str,
    amount: i64,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_DEBIT_CARD)
        .bind(card_id)
        .bind(amount)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

// Refund path: used is floored at zero and a depleted card comes back to
// active once it holds credit again.
const SQL_REFUND_CARD: &str = r#"
UPDATE cards
SET
  used = MAX(used - ?2, 0),
  remaining = remaining + ?2,
  status = CASE WHEN status = 'depleted' AND remaining + ?2 > 0 THEN 'active' ELSE status END
WHERE card_id = ?1
"#;

pub async fn refund_card(
    conn: &mut SqliteConnection,
    card_id: &str,
    amount: i64,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_REFUND_CARD)
        .bind(card_id)
        .bind(amount)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

const SQL_RECHARGE_CARD: &str = r#"
UPDATE cards
SET
  total = total + ?2,
  remaining = remaining + ?2,
  status = CASE WHEN status = 'depleted' AND remaining + ?2 > 0 THEN 'active' ELSE status END
WHERE card_id = ?1
"#;

pub async fn recharge_card(
    conn: &mut SqliteConnection,
    card_id: &str,
    amount: i64,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_RECHARGE_CARD)
        .bind(card_id)
        .bind(amount)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

// Signed adjustment of total and remaining together, so the
// remaining = total - used invariant holds after the change.
const SQL_ADJUST_CARD: &str = r#"
UPDATE cards
SET
  total = total + ?2,
  remaining = remaining + ?2,
  status = CASE
    WHEN remaining + ?2 <= 0 AND status = 'active' THEN 'depleted'
    WHEN remaining + ?2 > 0 AND status = 'depleted' THEN 'active'
    ELSE status
  END
WHERE card_id = ?1 AND remaining + ?2 >= 0
"#;

pub async fn adjust_card(
    conn: &mut SqliteConnection,
    card_id: &str,
    delta: i64,
) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_ADJUST_CARD)
        .bind(card_id)
        .bind(delta)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

// Lazy expiry: flip the status and write the leftover credit off so that
// remaining = total - used keeps holding.
const SQL_EXPIRE_CARD: &str = r#"
UPDATE cards
SET status = 'expired', used = total, remaining = 0
WHERE card_id = ?1 AND status != 'expired'
"#;

pub async fn expire_card(conn: &mut SqliteConnection, card_id: &str) -> sqlx::Result<bool> {
    let res = sqlx::query(SQL_EXPIRE_CARD)
        .bind(card_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}
