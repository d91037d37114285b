use chrono::{DateTime, Utc};

use crate::models::day::parse_ts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Count,
    Balance,
}

impl CardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CardKind::Count => "count",
            CardKind::Balance => "balance",
        }
    }

    pub fn parse(input: &str) -> Option<CardKind> {
        match input {
            "count" => Some(CardKind::Count),
            "balance" => Some(CardKind::Balance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Active,
    Depleted,
    Expired,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Depleted => "depleted",
            CardStatus::Expired => "expired",
        }
    }

    pub fn parse(input: &str) -> Option<CardStatus> {
        match input {
            "active" => Some(CardStatus::Active),
            "depleted" => Some(CardStatus::Depleted),
            "expired" => Some(CardStatus::Expired),
            _ => None,
        }
    }
}

/// Prepaid credit account. Invariant: `remaining = total - used`, never
/// negative; balance amounts are integer cents.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct CardRow {
    pub card_id: String,
    pub user_id: String,
    pub kind: String,
    pub total: i64,
    pub used: i64,
    pub remaining: i64,
    pub status: String,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl CardRow {
    pub fn kind(&self) -> Option<CardKind> {
        CardKind::parse(&self.kind)
    }

    pub fn status(&self) -> Option<CardStatus> {
        CardStatus::parse(&self.status)
    }

    /// Expiry is checked lazily on read; `None` means the card never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at.as_deref().and_then(parse_ts) {
            Some(expiry) => now > expiry,
            None => false,
        }
    }
}
