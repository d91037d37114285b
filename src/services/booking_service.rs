use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::database::{activity_repo, card_repo, join_repo};
use crate::models::day::{fmt_ts, parse_ts};
use crate::models::{ActivityRow, CreditDeduction, FormField, JoinRow, JoinStatus, Slot};
use crate::services::{booking_rules, credit_service, slot_service, BookingError};

async fn load_activity(pool: &SqlitePool, activity_id: &str) -> Result<ActivityRow, BookingError> {
    match activity_repo::get_activity(pool, activity_id).await? {
        Some(activity) => Ok(activity),
        None => Err(BookingError::NotFound),
    }
}

async fn load_slot(
    pool: &SqlitePool,
    activity_id: &str,
    slot_mark: &str,
) -> Result<Slot, BookingError> {
    let Some(day) = slot_service::mark_day(slot_mark) else {
        return Err(BookingError::Validation(format!(
            "invalid slot mark: {slot_mark}"
        )));
    };
    let (_, slots) = slot_service::get_day_with_slots(pool, activity_id, day).await?;
    slot_service::find_slot(&slots, slot_mark)
        .cloned()
        .ok_or(BookingError::NotFound)
}

fn validate_form(fields: &[FormField], form: &serde_json::Value) -> Result<(), BookingError> {
    if fields.is_empty() {
        return Ok(());
    }
    let Some(values) = form.as_object() else {
        return Err(BookingError::Validation(
            "form data must be an object".to_string(),
        ));
    };
    for field in fields {
        if !field.required {
            continue;
        }
        let filled = match values.get(&field.name) {
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        };
        if !filled {
            return Err(BookingError::Validation(format!(
                "field '{}' is required",
                field.label
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BookingPreview {
    pub eligible: bool,
    pub reason: Option<&'static str>,
    pub message: Option<String>,
    pub last_form: Option<serde_json::Value>,
}

/// Dry-run of the booking rules plus an echo of the form data the user
/// submitted last time, so the booking form can be prefilled. The ledger is
/// not consulted here; payment problems only surface on the real booking.
pub async fn preview_booking(
    pool: &SqlitePool,
    user_id: &str,
    activity_id: &str,
    slot_mark: &str,
    now: DateTime<Utc>,
) -> Result<BookingPreview, BookingError> {
    let activity = load_activity(pool, activity_id).await?;
    let slot = load_slot(pool, activity_id, slot_mark).await?;
    let succeeded = join_repo::count_succeeded(pool, activity_id, slot_mark).await?;
    let already = join_repo::find_succeeded(pool, user_id, activity_id, slot_mark)
        .await?
        .is_some();

    let verdict = booking_rules::check_booking(activity.status(), &slot, succeeded, already, now);
    let last_form = join_repo::find_latest_for_activity(pool, user_id, activity_id)
        .await?
        .and_then(|join| serde_json::from_str(&join.form_json).ok());

    Ok(match verdict {
        Ok(()) => BookingPreview {
            eligible: true,
            reason: None,
            message: None,
            last_form,
        },
        Err(err) if err.is_rule_violation() => BookingPreview {
            eligible: false,
            reason: Some(err.code()),
            message: Some(err.to_string()),
            last_form,
        },
        Err(err) => return Err(err),
    })
}

/// Book a slot. Orchestration order: rules, then the ledger debit, then the
/// guarded join insert, then the counter repair. Debit and insert are two
/// steps of one logical saga: when the insert loses the admission race the
/// debit is credited straight back.
pub async fn book(
    pool: &SqlitePool,
    user_id: &str,
    activity_id: &str,
    slot_mark: &str,
    form: serde_json::Value,
    card_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<JoinRow, BookingError> {
    let activity = load_activity(pool, activity_id).await?;
    let slot = load_slot(pool, activity_id, slot_mark).await?;
    validate_form(&activity.form_fields(), &form)?;

    // Fresh recount; the embedded counter is display-only.
    let succeeded = join_repo::count_succeeded(pool, activity_id, slot_mark).await?;
    let already = join_repo::find_succeeded(pool, user_id, activity_id, slot_mark)
        .await?
        .is_some();
    booking_rules::check_booking(activity.status(), &slot, succeeded, already, now)?;

    let join_id = Uuid::new_v4().to_string();
    let policy = activity.cost_policy();
    let mut deduction = None;

    if policy.charges() {
        let card = match card_id {
            Some(id) => {
                let Some(card) = card_repo::get_card(pool, id).await? else {
                    return Err(BookingError::NotFound);
                };
                // Never reveal whether a foreign card id exists.
                if card.user_id != user_id {
                    return Err(BookingError::NotFound);
                }
                card
            }
            None => {
                if !policy.allow_auto_select {
                    return Err(BookingError::Validation(
                        "this activity requires choosing a card".to_string(),
                    ));
                }
                credit_service::select_eligible_card(pool, user_id, &policy, now).await?
            }
        };
        let Some(kind) = card.kind() else {
            return Err(BookingError::CardUnusable);
        };
        if !credit_service::kind_compatible(policy.mode, kind) {
            return Err(BookingError::IncompatibleCardType);
        }
        let amount = credit_service::cost_for_kind(&policy, kind);
        if amount > 0 {
            let reason = format!("booking: {}", activity.title);
            credit_service::debit(pool, &card.card_id, amount, &reason, Some(&join_id), now)
                .await?;
            deduction = Some(CreditDeduction {
                card_id: card.card_id.clone(),
                kind: kind.as_str().to_string(),
                amount,
                deducted_at: fmt_ts(now),
                refunded: false,
                refunded_at: None,
                refund_reason: None,
            });
        }
    }

    let deduction_json = match &deduction {
        Some(d) => Some(serde_json::to_string(d)?),
        None => None,
    };
    let day = slot_service::mark_day(slot_mark).unwrap_or_default();
    let inserted = join_repo::insert_join_guarded(
        pool,
        join_repo::NewJoin {
            join_id: &join_id,
            activity_id,
            user_id,
            day,
            slot_mark,
            start_at: &slot.start,
            end_at: &slot.end,
            form_json: &form.to_string(),
            deduction_json: deduction_json.as_deref(),
            created_at: &fmt_ts(now),
        },
        slot.capacity.is_limited,
        slot.capacity.limit,
    )
    .await?;

    if !inserted {
        // Lost the admission race after the debit went through: compensate.
        if let Some(d) = &deduction {
            if let Err(err) = credit_service::refund(
                pool,
                &d.card_id,
                d.amount,
                "booking rejected",
                Some(&join_id),
                now,
            )
            .await
            {
                warn!(
                    "compensating refund failed for card {} after rejected booking {}: {}",
                    d.card_id, join_id, err
                );
            }
        }
        let lost_to_self = join_repo::find_succeeded(pool, user_id, activity_id, slot_mark)
            .await?
            .is_some();
        return Err(if lost_to_self {
            BookingError::AlreadyBooked
        } else {
            BookingError::SlotFull
        });
    }

    repair_stats(pool, activity_id, slot_mark).await;

    match join_repo::get_join(pool, &join_id).await? {
        Some(join) => Ok(join),
        None => Err(BookingError::NotFound),
    }
}

// Counter repair is best effort; a failure leaves a stale display counter,
// never a wrong admission decision.
async fn repair_stats(pool: &SqlitePool, activity_id: &str, slot_mark: &str) {
    if let Err(err) = slot_service::recompute_slot_stats(pool, activity_id, slot_mark).await {
        warn!(
            "slot stats recompute failed for {} {}: {}",
            activity_id, slot_mark, err
        );
    }
}

// Refund-then-mark for a cancelled join. The deduction note's refunded flag
// is what prevents double refunds; a failed refund is logged and left for
// reconciliation without blocking the cancellation itself.
async fn refund_on_cancel(pool: &SqlitePool, join: &JoinRow, reason: &str, now: DateTime<Utc>) {
    let Some(mut deduction) = join.deduction() else {
        return;
    };
    if deduction.refunded {
        return;
    }
    if let Err(err) = credit_service::refund(
        pool,
        &deduction.card_id,
        deduction.amount,
        reason,
        Some(&join.join_id),
        now,
    )
    .await
    {
        warn!(
            "refund failed for join {} on card {}: {} (needs reconciliation)",
            join.join_id, deduction.card_id, err
        );
        return;
    }
    deduction.refunded = true;
    deduction.refunded_at = Some(fmt_ts(now));
    deduction.refund_reason = Some(reason.to_string());
    match serde_json::to_string(&deduction) {
        Ok(json) => {
            if let Err(err) = join_repo::update_deduction(pool, &join.join_id, &json).await {
                warn!(
                    "failed to mark join {} as refunded: {} (needs reconciliation)",
                    join.join_id, err
                );
            }
        }
        Err(err) => warn!("failed to encode deduction for join {}: {}", join.join_id, err),
    }
}

/// User-initiated cancellation: only a live, not-yet-checked-in booking,
/// and only while the cancellation window is still open.
pub async fn cancel_join(
    pool: &SqlitePool,
    user_id: &str,
    join_id: &str,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    let Some(join) = join_repo::get_join(pool, join_id).await? else {
        return Err(BookingError::NotFound);
    };
    if join.user_id != user_id {
        return Err(BookingError::NotFound);
    }
    if !join.is_succeeded() {
        return Err(BookingError::Validation(
            "this booking is no longer active".to_string(),
        ));
    }
    if join.checked_in != 0 {
        return Err(BookingError::Validation(
            "a checked-in booking cannot be cancelled".to_string(),
        ));
    }

    let activity = load_activity(pool, &join.activity_id).await?;
    let Some(start) = parse_ts(&join.start_at) else {
        return Err(BookingError::Validation(
            "booking has an invalid start time".to_string(),
        ));
    };
    booking_rules::check_cancellation(&activity.cancel_policy(), start, now)?;

    refund_on_cancel(pool, &join, "user cancelled", now).await;
    if !join_repo::mark_cancelled(
        pool,
        join_id,
        JoinStatus::UserCancelled.as_str(),
        &fmt_ts(now),
        None,
    )
    .await?
    {
        return Err(BookingError::Validation(
            "this booking is no longer active".to_string(),
        ));
    }
    repair_stats(pool, &join.activity_id, &join.slot_mark).await;
    Ok(())
}

async fn admin_cancel_one(
    pool: &SqlitePool,
    join: &JoinRow,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<bool, BookingError> {
    refund_on_cancel(pool, join, reason, now).await;
    Ok(join_repo::mark_cancelled(
        pool,
        &join.join_id,
        JoinStatus::AdminCancelled.as_str(),
        &fmt_ts(now),
        Some(reason),
    )
    .await?)
}

/// Staff cancellation of one join. The cancellation-window rule is an
/// end-user rule; staff authority overrides it, the refund still happens.
pub async fn admin_cancel_join(
    pool: &SqlitePool,
    join_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    let Some(join) = join_repo::get_join(pool, join_id).await? else {
        return Err(BookingError::NotFound);
    };
    if !join.is_succeeded() {
        return Err(BookingError::Validation(
            "this booking is no longer active".to_string(),
        ));
    }
    if !admin_cancel_one(pool, &join, reason, now).await? {
        return Err(BookingError::Validation(
            "this booking is no longer active".to_string(),
        ));
    }
    repair_stats(pool, &join.activity_id, &join.slot_mark).await;
    Ok(())
}

/// Mass cancellation of every live join on a slot, e.g. when a session is
/// called off. Returns how many joins were cancelled.
pub async fn admin_cancel_by_slot(
    pool: &SqlitePool,
    activity_id: &str,
    slot_mark: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<u64, BookingError> {
    let joins = join_repo::list_succeeded_by_slot(pool, activity_id, slot_mark).await?;
    let mut cancelled = 0u64;
    for join in &joins {
        if admin_cancel_one(pool, join, reason, now).await? {
            cancelled += 1;
        }
    }
    repair_stats(pool, activity_id, slot_mark).await;
    Ok(cancelled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    CheckedIn,
    AlreadyCheckedIn,
}

impl CheckInOutcome {
    pub fn message(self) -> &'static str {
        match self {
            CheckInOutcome::CheckedIn => "checked in, see you there",
            CheckInOutcome::AlreadyCheckedIn => "already checked in",
        }
    }
}

/// Self check-in against a slot mark. Only valid on the slot's calendar
/// day; repeating it is a no-op, not an error.
pub async fn check_in_self(
    pool: &SqlitePool,
    user_id: &str,
    slot_mark: &str,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, BookingError> {
    let Some(join) = join_repo::find_succeeded_by_mark(pool, user_id, slot_mark).await? else {
        return Err(BookingError::NotFound);
    };
    let today = now.date_naive().format("%Y-%m-%d").to_string();
    if join.day != today {
        return Err(BookingError::Validation(
            "check-in is only available on the day of the slot".to_string(),
        ));
    }
    if join.checked_in != 0 {
        return Ok(CheckInOutcome::AlreadyCheckedIn);
    }
    if !join_repo::set_checked_in(pool, &join.join_id, true).await? {
        return Err(BookingError::NotFound);
    }
    Ok(CheckInOutcome::CheckedIn)
}

/// Staff check-in toggle. No day restriction; the flag can be set or
/// cleared freely while the join is live.
pub async fn admin_set_check_in(
    pool: &SqlitePool,
    join_id: &str,
    flag: bool,
) -> Result<(), BookingError> {
    if join_repo::get_join(pool, join_id).await?.is_none() {
        return Err(BookingError::NotFound);
    }
    if !join_repo::set_checked_in(pool, join_id, flag).await? {
        return Err(BookingError::Validation(
            "this booking is no longer active".to_string(),
        ));
    }
    Ok(())
}

/// Storage hygiene: drops the caller's cancelled rows and finished
/// bookings. Not a state transition, just deletion.
pub async fn cleanup_finished(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, BookingError> {
    Ok(join_repo::delete_finished(pool, user_id, &fmt_ts(now)).await?)
}

pub async fn list_my_joins(
    pool: &SqlitePool,
    user_id: &str,
    include_cancelled: bool,
) -> Result<Vec<JoinRow>, BookingError> {
    Ok(join_repo::list_user_joins(pool, user_id, include_cancelled).await?)
}
