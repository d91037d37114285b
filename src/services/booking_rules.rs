use chrono::{DateTime, Utc};

use crate::models::{ActivityStatus, CancelPolicy, Slot};
use crate::services::BookingError;

/// Booking eligibility. Pure: callers load the state, this decides.
///
/// Rules run in the fixed order Open -> Capacity -> Cutoff -> PerUser and
/// the first failure wins, so the user always sees one stable message for
/// a given slot state.
///
/// `succeeded_count` must be a fresh recount from the joins collection,
/// not the cached slot counter; the counter is display-only.
pub fn check_booking(
    activity_status: ActivityStatus,
    slot: &Slot,
    succeeded_count: i64,
    already_booked: bool,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if activity_status != ActivityStatus::Active || !slot.is_open {
        return Err(BookingError::SlotClosed);
    }

    if slot.capacity.is_limited && succeeded_count >= slot.capacity.limit {
        return Err(BookingError::SlotFull);
    }

    // An unparseable start time can never be booked against.
    let Some(start) = slot.start_at() else {
        return Err(BookingError::SlotClosed);
    };
    // Cutoff is the slot start itself; no grace period.
    if now >= start {
        return Err(BookingError::WindowPassed);
    }

    if already_booked {
        return Err(BookingError::AlreadyBooked);
    }

    Ok(())
}

/// Cancellation window. Only evaluated for user-initiated cancels; admin
/// cancels override this rule by never calling it.
pub fn check_cancellation(
    policy: &CancelPolicy,
    slot_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if !policy.limited {
        return Ok(());
    }
    let Some(lead) = policy.lead_time() else {
        // Sentinel: never cancellable.
        return Err(BookingError::CancelForbidden);
    };
    let deadline = slot_start - lead;
    if now >= deadline {
        return Err(BookingError::CancelForbidden);
    }
    Ok(())
}
