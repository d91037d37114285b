use thiserror::Error;

/// Engine-wide error taxonomy. Rule violations and ledger failures are
/// surfaced to the user verbatim; `NotFound` is deliberately vague so the
/// existence of other users' data never leaks; system errors carry full
/// context for the log and an opaque message for the user.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("this time slot is fully booked")]
    SlotFull,

    #[error("this time slot is not open for booking")]
    SlotClosed,

    #[error("you already have a booking for this time slot")]
    AlreadyBooked,

    #[error("the booking window for this time slot has passed")]
    WindowPassed,

    #[error("this booking can no longer be cancelled")]
    CancelForbidden,

    #[error("not enough credit on the selected card")]
    InsufficientCredit,

    #[error("the selected card cannot be used")]
    CardUnusable,

    #[error("the selected card type does not match this activity")]
    IncompatibleCardType,

    #[error("selection invalid, please retry")]
    NotFound,

    #[error("stored document corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    System(#[from] sqlx::Error),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::SlotFull => "slot_full",
            BookingError::SlotClosed => "slot_closed",
            BookingError::AlreadyBooked => "already_booked",
            BookingError::WindowPassed => "window_passed",
            BookingError::CancelForbidden => "cancel_forbidden",
            BookingError::InsufficientCredit => "insufficient_credit",
            BookingError::CardUnusable => "card_unusable",
            BookingError::IncompatibleCardType => "incompatible_card_type",
            BookingError::NotFound => "not_found",
            BookingError::Corrupt(_) | BookingError::System(_) => "system",
        }
    }

    /// Business-rule refusals from the booking/cancellation rule set.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            BookingError::SlotFull
                | BookingError::SlotClosed
                | BookingError::AlreadyBooked
                | BookingError::WindowPassed
                | BookingError::CancelForbidden
        )
    }
}
