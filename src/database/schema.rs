use sqlx::SqlitePool;

// Idempotent bootstrap of the engine-owned collections. The users table is
// a projection fed by the identity service; everything else is ours.
const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS activities (
  activity_id       TEXT PRIMARY KEY,
  title             TEXT NOT NULL,
  status            TEXT NOT NULL DEFAULT 'disabled',
  cancel_limited    INTEGER NOT NULL DEFAULT 0,
  cancel_days       INTEGER NOT NULL DEFAULT 0,
  cancel_hours      INTEGER NOT NULL DEFAULT 0,
  cancel_minutes    INTEGER NOT NULL DEFAULT 0,
  cost_enabled      INTEGER NOT NULL DEFAULT 0,
  cost_mode         TEXT NOT NULL DEFAULT 'free',
  count_cost        INTEGER NOT NULL DEFAULT 0,
  balance_cost      INTEGER NOT NULL DEFAULT 0,
  allow_auto_select INTEGER NOT NULL DEFAULT 1,
  open_days_json    TEXT NOT NULL DEFAULT '[]',
  form_schema_json  TEXT NOT NULL DEFAULT '[]'
)
    "#,
    r#"
CREATE TABLE IF NOT EXISTS activity_days (
  activity_id TEXT NOT NULL,
  day         TEXT NOT NULL,
  slots_json  TEXT NOT NULL DEFAULT '[]',
  PRIMARY KEY (activity_id, day)
)
    "#,
    r#"
CREATE TABLE IF NOT EXISTS joins (
  join_id        TEXT PRIMARY KEY,
  activity_id    TEXT NOT NULL,
  user_id        TEXT NOT NULL,
  day            TEXT NOT NULL,
  slot_mark      TEXT NOT NULL,
  start_at       TEXT NOT NULL,
  end_at         TEXT NOT NULL,
  status         TEXT NOT NULL DEFAULT 'succeeded',
  checked_in     INTEGER NOT NULL DEFAULT 0,
  form_json      TEXT NOT NULL DEFAULT '{}',
  deduction_json TEXT,
  created_at     TEXT NOT NULL,
  cancelled_at   TEXT,
  cancel_reason  TEXT
)
    "#,
    r#"
CREATE INDEX IF NOT EXISTS idx_joins_slot
  ON joins (activity_id, slot_mark, status)
    "#,
    r#"
CREATE INDEX IF NOT EXISTS idx_joins_user
  ON joins (user_id, status)
    "#,
    r#"
CREATE TABLE IF NOT EXISTS cards (
  card_id    TEXT PRIMARY KEY,
  user_id    TEXT NOT NULL,
  kind       TEXT NOT NULL,
  total      INTEGER NOT NULL DEFAULT 0,
  used       INTEGER NOT NULL DEFAULT 0,
  remaining  INTEGER NOT NULL DEFAULT 0 CHECK (remaining >= 0),
  status     TEXT NOT NULL DEFAULT 'active',
  expires_at TEXT,
  created_at TEXT NOT NULL
)
    "#,
    r#"
CREATE TABLE IF NOT EXISTS card_ledger (
  entry_id         TEXT PRIMARY KEY,
  card_id          TEXT NOT NULL,
  user_id          TEXT NOT NULL,
  kind             TEXT NOT NULL,
  delta            INTEGER NOT NULL,
  remaining_before INTEGER NOT NULL,
  remaining_after  INTEGER NOT NULL,
  reason           TEXT NOT NULL,
  related_id       TEXT,
  created_at       TEXT NOT NULL
)
    "#,
    r#"
CREATE TABLE IF NOT EXISTS users (
  user_id      TEXT PRIMARY KEY,
  display_name TEXT NOT NULL
)
    "#,
];

pub async fn ensure_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
