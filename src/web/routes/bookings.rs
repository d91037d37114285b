use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::models::{CreditDeduction, JoinRow};
use crate::services::booking_service;
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::routes::respond::{error_response, ApiError};

#[derive(Debug, Serialize)]
pub struct JoinView {
    pub join_id: String,
    pub activity_id: String,
    pub day: String,
    pub slot_mark: String,
    pub start: String,
    pub end: String,
    pub status: String,
    pub checked_in: bool,
    pub deduction: Option<CreditDeduction>,
    pub cancel_reason: Option<String>,
}

impl From<JoinRow> for JoinView {
    fn from(row: JoinRow) -> Self {
        let deduction = row.deduction();
        JoinView {
            join_id: row.join_id,
            activity_id: row.activity_id,
            day: row.day,
            slot_mark: row.slot_mark,
            start: row.start_at,
            end: row.end_at,
            status: row.status,
            checked_in: row.checked_in != 0,
            deduction,
            cancel_reason: row.cancel_reason,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct BookBody {
    #[serde(default)]
    pub form: Value,
    pub card_id: Option<String>,
}

pub async fn book_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path((activity_id, slot_mark)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
    Json(body): Json<BookBody>,
) -> Result<Json<JoinView>, ApiError> {
    let join = booking_service::book(
        &pool,
        &auth_user.id,
        &activity_id,
        &slot_mark,
        body.form,
        body.card_id.as_deref(),
        Utc::now(),
    )
    .await
    .map_err(|e| error_response("book slot", e))?;
    Ok(Json(JoinView::from(join)))
}

pub async fn cancel_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(join_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    booking_service::cancel_join(&pool, &auth_user.id, &join_id, Utc::now())
        .await
        .map_err(|e| error_response("cancel booking", e))?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    pub slot_mark: String,
}

pub async fn checkin_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
    Json(body): Json<CheckInBody>,
) -> Result<Json<Value>, ApiError> {
    let outcome =
        booking_service::check_in_self(&pool, &auth_user.id, &body.slot_mark, Utc::now())
            .await
            .map_err(|e| error_response("self check-in", e))?;
    Ok(Json(serde_json::json!({ "message": outcome.message() })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListJoinsQuery {
    pub include_cancelled: Option<bool>,
}

pub async fn list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<ListJoinsQuery>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let joins = booking_service::list_my_joins(
        &pool,
        &auth_user.id,
        query.include_cancelled.unwrap_or(false),
    )
    .await
    .map_err(|e| error_response("list bookings", e))?;
    let views: Vec<JoinView> = joins.into_iter().map(JoinView::from).collect();
    Ok(Json(serde_json::json!({ "joins": views })))
}

pub async fn cleanup_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let removed = booking_service::cleanup_finished(&pool, &auth_user.id, Utc::now())
        .await
        .map_err(|e| error_response("cleanup bookings", e))?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}
