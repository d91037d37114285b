use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::database::{activity_repo, day_repo, join_repo};
use crate::models::{DayRow, Slot, SlotCapacity};
use crate::services::BookingError;

/// Admin authoring input for one slot on a day. Times are `HH:MM` wall
/// clock; the stored timestamps and the mark are derived from them.
#[derive(Debug, Deserialize)]
pub struct SlotSpec {
    pub start: String,
    pub end: String,
    pub is_open: bool,
    pub is_limited: bool,
    #[serde(default)]
    pub limit: i64,
}

pub fn slot_mark(day: &str, start: &str) -> String {
    format!("{day}@{start}")
}

/// The mark encodes its calendar day before the `@`.
pub fn mark_day(mark: &str) -> Option<&str> {
    mark.split_once('@').map(|(day, _)| day)
}

fn parse_day(day: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| BookingError::Validation(format!("invalid day: {day}")))
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, BookingError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| BookingError::Validation(format!("invalid time: {raw}")))
}

pub async fn get_day_with_slots(
    pool: &SqlitePool,
    activity_id: &str,
    day: &str,
) -> Result<(DayRow, Vec<Slot>), BookingError> {
    let Some(row) = day_repo::get_day(pool, activity_id, day).await? else {
        return Err(BookingError::NotFound);
    };
    let slots = row.slots()?;
    Ok((row, slots))
}

/// Open dates come from the denormalized cache on the activity, refreshed
/// by the authoring path below.
pub async fn get_open_dates_from(
    pool: &SqlitePool,
    activity_id: &str,
    from: &str,
) -> Result<Vec<String>, BookingError> {
    parse_day(from)?;
    let Some(activity) = activity_repo::get_activity(pool, activity_id).await? else {
        return Err(BookingError::NotFound);
    };
    let mut days: Vec<String> = activity
        .open_days()
        .into_iter()
        .filter(|day| day.as_str() >= from)
        .collect();
    days.sort();
    Ok(days)
}

/// Replace the whole slot list for a future day. Existing live counters are
/// carried over by recounting from the joins collection, so re-authoring a
/// day never invents or loses bookings.
pub async fn replace_day_slots(
    pool: &SqlitePool,
    activity_id: &str,
    day: &str,
    specs: Vec<SlotSpec>,
    now: DateTime<Utc>,
) -> Result<Vec<Slot>, BookingError> {
    let date = parse_day(day)?;
    if date < now.date_naive() {
        return Err(BookingError::Validation(
            "cannot edit a day in the past".to_string(),
        ));
    }
    if activity_repo::get_activity(pool, activity_id).await?.is_none() {
        return Err(BookingError::NotFound);
    }

    let mut slots = Vec::with_capacity(specs.len());
    for spec in &specs {
        let start = parse_hhmm(&spec.start)?;
        let end = parse_hhmm(&spec.end)?;
        if end <= start {
            return Err(BookingError::Validation(format!(
                "slot {} ends before it starts",
                spec.start
            )));
        }
        if spec.is_limited && spec.limit < 1 {
            return Err(BookingError::Validation(format!(
                "slot {} has a zero capacity limit",
                spec.start
            )));
        }
        let mark = slot_mark(day, &spec.start);
        if slots.iter().any(|s: &Slot| s.mark == mark) {
            return Err(BookingError::Validation(format!(
                "duplicate slot start {}",
                spec.start
            )));
        }
        slots.push(Slot {
            mark: mark.clone(),
            start: format!("{day}T{start}:00Z", start = spec.start),
            end: format!("{day}T{end}:00Z", end = spec.end),
            is_open: spec.is_open,
            capacity: SlotCapacity {
                is_limited: spec.is_limited,
                limit: spec.limit,
            },
            stats: join_repo::status_counts(pool, activity_id, &mark).await?,
        });
    }
    slots.sort_by(|a, b| a.start.cmp(&b.start));

    let slots_json = serde_json::to_string(&slots)?;
    day_repo::upsert_day(pool, activity_id, day, &slots_json).await?;
    refresh_open_days(pool, activity_id).await?;
    Ok(slots)
}

/// Recount the per-status join totals for one mark and overwrite the
/// embedded counters. This is the only writer of slot stats; it runs after
/// every booking, cancel, and admin bulk cancel. It is deliberately not
/// transactional with the join write: a brief window of stale counters is
/// accepted, and the counters are never trusted for admission decisions.
pub async fn recompute_slot_stats(
    pool: &SqlitePool,
    activity_id: &str,
    slot_mark: &str,
) -> Result<(), BookingError> {
    let Some(day) = mark_day(slot_mark) else {
        return Err(BookingError::Validation(format!(
            "invalid slot mark: {slot_mark}"
        )));
    };
    let Some(row) = day_repo::get_day(pool, activity_id, day).await? else {
        // Day record gone; nothing to repair.
        return Ok(());
    };
    let mut slots = row.slots()?;
    let Some(slot) = slots.iter_mut().find(|s| s.mark == slot_mark) else {
        return Ok(());
    };
    slot.stats = join_repo::status_counts(pool, activity_id, slot_mark).await?;
    let slots_json = serde_json::to_string(&slots)?;
    day_repo::upsert_day(pool, activity_id, day, &slots_json).await?;
    Ok(())
}

async fn refresh_open_days(pool: &SqlitePool, activity_id: &str) -> Result<(), BookingError> {
    let rows = day_repo::list_days(pool, activity_id).await?;
    let mut open_days = Vec::new();
    for row in rows {
        if row.slots()?.iter().any(|slot| slot.is_open) {
            open_days.push(row.day);
        }
    }
    let json = serde_json::to_string(&open_days)?;
    activity_repo::update_open_days(pool, activity_id, &json).await?;
    Ok(())
}

/// Look a slot up inside a loaded day.
pub fn find_slot<'a>(slots: &'a [Slot], mark: &str) -> Option<&'a Slot> {
    slots.iter().find(|slot| slot.mark == mark)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_encodes_its_day() {
        assert_eq!(mark_day("2026-09-01@09:00"), Some("2026-09-01"));
        assert_eq!(mark_day("garbage"), None);
        assert_eq!(slot_mark("2026-09-01", "09:00"), "2026-09-01@09:00");
    }
}
