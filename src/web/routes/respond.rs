use axum::{http::StatusCode, Json};
use serde_json::Value;
use tracing::warn;

use crate::services::BookingError;

pub type ApiError = (StatusCode, Json<Value>);

/// One place that turns engine errors into wire responses. Rule refusals
/// carry their code so clients can react to the specific rule; storage
/// failures are logged here with context and surfaced as an opaque busy
/// message.
pub fn error_response(context: &str, err: BookingError) -> ApiError {
    let status = match &err {
        BookingError::Validation(_) | BookingError::IncompatibleCardType => {
            StatusCode::BAD_REQUEST
        }
        BookingError::SlotFull
        | BookingError::SlotClosed
        | BookingError::AlreadyBooked
        | BookingError::WindowPassed
        | BookingError::CancelForbidden
        | BookingError::InsufficientCredit
        | BookingError::CardUnusable => StatusCode::CONFLICT,
        BookingError::NotFound => StatusCode::NOT_FOUND,
        BookingError::Corrupt(_) | BookingError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!("{context} failed: {err}");
        return (
            status,
            Json(serde_json::json!({
                "error": "system",
                "message": "service busy, please retry"
            })),
        );
    }

    (
        status,
        Json(serde_json::json!({
            "error": err.code(),
            "message": err.to_string()
        })),
    )
}

pub fn forbidden() -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": "forbidden", "message": "staff only" })),
    )
}
