#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Recharge,
    Consume,
    AdminAdjust,
    ExpireWriteOff,
}

impl LedgerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerKind::Recharge => "recharge",
            LedgerKind::Consume => "consume",
            LedgerKind::AdminAdjust => "admin_adjust",
            LedgerKind::ExpireWriteOff => "expire_write_off",
        }
    }
}

/// Append-only debit/credit record with before/after snapshots of the
/// card's remaining value. Never updated or deleted.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct LedgerEntryRow {
    pub entry_id: String,
    pub card_id: String,
    pub user_id: String,
    pub kind: String,
    pub delta: i64,
    pub remaining_before: i64,
    pub remaining_after: i64,
    pub reason: String,
    pub related_id: Option<String>,
    pub created_at: String,
}
