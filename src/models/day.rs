use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCapacity {
    pub is_limited: bool,
    pub limit: i64,
}

/// Materialized per-slot counters. Display cache only: the source of truth
/// is the joins collection, and `slot_service::recompute_slot_stats` is the
/// only writer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotStats {
    pub succeeded: i64,
    pub user_cancelled: i64,
    pub admin_cancelled: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    /// Stable identifier, `YYYY-MM-DD@HH:MM` (day + start time).
    pub mark: String,
    pub start: String,
    pub end: String,
    pub is_open: bool,
    pub capacity: SlotCapacity,
    #[serde(default)]
    pub stats: SlotStats,
}

impl Slot {
    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        parse_ts(&self.start)
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        parse_ts(&self.end)
    }
}

pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Stored timestamps are whole-second UTC RFC 3339 (`...T10:00:00Z`), the
/// same shape the slot authoring path produces, so string comparison in
/// SQL orders them correctly.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[derive(Debug, sqlx::FromRow, Clone)]
pub struct DayRow {
    pub activity_id: String,
    pub day: String,
    pub slots_json: String,
}

impl DayRow {
    pub fn slots(&self) -> serde_json::Result<Vec<Slot>> {
        serde_json::from_str(&self.slots_json)
    }
}
