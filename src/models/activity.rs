use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Sentinel for `CancelPolicy.days`: the booking can never be cancelled.
pub const CANCEL_NEVER: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Disabled,
    Active,
    ClosedToNew,
    Closed,
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Disabled => "disabled",
            ActivityStatus::Active => "active",
            ActivityStatus::ClosedToNew => "closed_to_new",
            ActivityStatus::Closed => "closed",
        }
    }

    pub fn parse(input: &str) -> ActivityStatus {
        match input {
            "active" => ActivityStatus::Active,
            "closed_to_new" => ActivityStatus::ClosedToNew,
            "closed" => ActivityStatus::Closed,
            _ => ActivityStatus::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CancelPolicy {
    pub limited: bool,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl CancelPolicy {
    /// Lead time required before slot start to still allow cancellation.
    /// `None` means the booking can never be cancelled.
    pub fn lead_time(&self) -> Option<Duration> {
        if self.days == CANCEL_NEVER {
            return None;
        }
        Some(Duration::days(self.days) + Duration::hours(self.hours) + Duration::minutes(self.minutes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostMode {
    Free,
    Count,
    Balance,
    Either,
}

impl CostMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CostMode::Free => "free",
            CostMode::Count => "count",
            CostMode::Balance => "balance",
            CostMode::Either => "either",
        }
    }

    pub fn parse(input: &str) -> CostMode {
        match input {
            "count" => CostMode::Count,
            "balance" => CostMode::Balance,
            "either" => CostMode::Either,
            _ => CostMode::Free,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CostPolicy {
    pub enabled: bool,
    pub mode: CostMode,
    pub count_cost: i64,
    pub balance_cost: i64,
    pub allow_auto_select: bool,
}

impl CostPolicy {
    pub fn charges(&self) -> bool {
        self.enabled && self.mode != CostMode::Free
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, sqlx::FromRow, Clone)]
pub struct ActivityRow {
    pub activity_id: String,
    pub title: String,
    pub status: String,
    pub cancel_limited: i64,
    pub cancel_days: i64,
    pub cancel_hours: i64,
    pub cancel_minutes: i64,
    pub cost_enabled: i64,
    pub cost_mode: String,
    pub count_cost: i64,
    pub balance_cost: i64,
    pub allow_auto_select: i64,
    pub open_days_json: String,
    pub form_schema_json: String,
}

impl ActivityRow {
    pub fn status(&self) -> ActivityStatus {
        ActivityStatus::parse(&self.status)
    }

    pub fn cancel_policy(&self) -> CancelPolicy {
        CancelPolicy {
            limited: self.cancel_limited != 0,
            days: self.cancel_days,
            hours: self.cancel_hours,
            minutes: self.cancel_minutes,
        }
    }

    pub fn cost_policy(&self) -> CostPolicy {
        CostPolicy {
            enabled: self.cost_enabled != 0,
            mode: CostMode::parse(&self.cost_mode),
            count_cost: self.count_cost,
            balance_cost: self.balance_cost,
            allow_auto_select: self.allow_auto_select != 0,
        }
    }

    /// Denormalized cache of days currently open for booking, refreshed by
    /// the day-authoring path.
    pub fn open_days(&self) -> Vec<String> {
        serde_json::from_str(&self.open_days_json).unwrap_or_default()
    }

    pub fn form_fields(&self) -> Vec<FormField> {
        serde_json::from_str(&self.form_schema_json).unwrap_or_default()
    }
}
