use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::card_repo;
use crate::models::day::fmt_ts;
use crate::models::CardKind;
use crate::services::slot_service::{self, SlotSpec};
use crate::services::{booking_service, credit_service, BookingError};
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::routes::respond::{error_response, forbidden, ApiError};
use crate::web::state::AppState;

fn require_staff(auth_user: &AuthenticatedUser) -> Result<(), ApiError> {
    if auth_user.is_staff {
        Ok(())
    } else {
        Err(forbidden())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceSlotsBody {
    pub slots: Vec<SlotSpec>,
}

pub async fn replace_day_slots_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path((activity_id, day)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
    Json(body): Json<ReplaceSlotsBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    let slots = slot_service::replace_day_slots(&pool, &activity_id, &day, body.slots, Utc::now())
        .await
        .map_err(|e| error_response("replace day slots", e))?;
    Ok(Json(serde_json::json!({ "day": day, "slots": slots })))
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub reason: String,
}

pub async fn cancel_slot_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path((activity_id, slot_mark)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
    Json(body): Json<CancelBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    let cancelled = booking_service::admin_cancel_by_slot(
        &pool,
        &activity_id,
        &slot_mark,
        &body.reason,
        Utc::now(),
    )
    .await
    .map_err(|e| error_response("admin cancel slot", e))?;
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}

pub async fn cancel_join_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(join_id): Path<String>,
    State(pool): State<SqlitePool>,
    Json(body): Json<CancelBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    booking_service::admin_cancel_join(&pool, &join_id, &body.reason, Utc::now())
        .await
        .map_err(|e| error_response("admin cancel booking", e))?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    pub flag: bool,
}

pub async fn checkin_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(join_id): Path<String>,
    State(pool): State<SqlitePool>,
    Json(body): Json<CheckInBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    booking_service::admin_set_check_in(&pool, &join_id, body.flag)
        .await
        .map_err(|e| error_response("admin check-in", e))?;
    Ok(Json(serde_json::json!({ "checked_in": body.flag })))
}

#[derive(Debug, Deserialize)]
pub struct CreateCardBody {
    pub user_id: String,
    pub kind: String,
    pub total: i64,
    pub expires_at: Option<String>,
}

pub async fn create_card_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    Json(body): Json<CreateCardBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    if CardKind::parse(&body.kind).is_none() {
        return Err(error_response(
            "create card",
            BookingError::Validation(format!("unknown card kind: {}", body.kind)),
        ));
    }
    if body.total < 0 {
        return Err(error_response(
            "create card",
            BookingError::Validation("total must not be negative".to_string()),
        ));
    }
    let card_id = Uuid::new_v4().to_string();
    card_repo::insert_card(
        &pool,
        &card_id,
        &body.user_id,
        &body.kind,
        body.total,
        body.expires_at.as_deref(),
        &fmt_ts(Utc::now()),
    )
    .await
    .map_err(|e| error_response("create card", e.into()))?;
    Ok(Json(serde_json::json!({ "card_id": card_id })))
}

#[derive(Debug, Deserialize)]
pub struct RechargeBody {
    pub amount: i64,
    pub reason: String,
}

pub async fn recharge_card_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(card_id): Path<String>,
    State(pool): State<SqlitePool>,
    Json(body): Json<RechargeBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    credit_service::recharge(&pool, &card_id, body.amount, &body.reason, Utc::now())
        .await
        .map_err(|e| error_response("recharge card", e))?;
    Ok(Json(serde_json::json!({ "recharged": body.amount })))
}

#[derive(Debug, Deserialize)]
pub struct AdjustBody {
    pub delta: i64,
    pub reason: String,
}

pub async fn adjust_card_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(card_id): Path<String>,
    State(pool): State<SqlitePool>,
    Json(body): Json<AdjustBody>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    credit_service::adjust(&pool, &card_id, body.delta, &body.reason, Utc::now())
        .await
        .map_err(|e| error_response("adjust card", e))?;
    Ok(Json(serde_json::json!({ "adjusted": body.delta })))
}

pub async fn invalidate_leaderboard_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    require_staff(&auth_user)?;
    state.leaderboard.invalidate();
    Ok(Json(serde_json::json!({ "invalidated": true })))
}
