use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    Succeeded,
    UserCancelled,
    AdminCancelled,
}

impl JoinStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinStatus::Succeeded => "succeeded",
            JoinStatus::UserCancelled => "user_cancelled",
            JoinStatus::AdminCancelled => "admin_cancelled",
        }
    }

    pub fn parse(input: &str) -> Option<JoinStatus> {
        match input {
            "succeeded" => Some(JoinStatus::Succeeded),
            "user_cancelled" => Some(JoinStatus::UserCancelled),
            "admin_cancelled" => Some(JoinStatus::AdminCancelled),
            _ => None,
        }
    }
}

/// Note embedded on a join recording the credit debit that paid for it.
/// `refunded` is the single source of truth for "has this debit been
/// reversed" — the ledger itself does not detect double refunds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDeduction {
    pub card_id: String,
    pub kind: String,
    pub amount: i64,
    pub deducted_at: String,
    #[serde(default)]
    pub refunded: bool,
    pub refunded_at: Option<String>,
    pub refund_reason: Option<String>,
}

#[derive(Debug, sqlx::FromRow, Clone)]
pub struct JoinRow {
    pub join_id: String,
    pub activity_id: String,
    pub user_id: String,
    pub day: String,
    pub slot_mark: String,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub checked_in: i64,
    pub form_json: String,
    pub deduction_json: Option<String>,
    pub created_at: String,
    pub cancelled_at: Option<String>,
    pub cancel_reason: Option<String>,
}

impl JoinRow {
    pub fn status(&self) -> Option<JoinStatus> {
        JoinStatus::parse(&self.status)
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == JoinStatus::Succeeded.as_str()
    }

    pub fn deduction(&self) -> Option<CreditDeduction> {
        self.deduction_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
