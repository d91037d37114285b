use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::services::{booking_service, slot_service};
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::routes::respond::{error_response, ApiError};

pub async fn day_handler(
    Extension(_auth_user): Extension<AuthenticatedUser>,
    Path((activity_id, day)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let (_, slots) = slot_service::get_day_with_slots(&pool, &activity_id, &day)
        .await
        .map_err(|e| error_response("load day", e))?;
    Ok(Json(serde_json::json!({
        "activity_id": activity_id,
        "day": day,
        "slots": slots,
    })))
}

#[derive(Debug, Deserialize)]
pub struct OpenDatesQuery {
    pub from: Option<String>,
}

pub async fn open_dates_handler(
    Extension(_auth_user): Extension<AuthenticatedUser>,
    Path(activity_id): Path<String>,
    Query(query): Query<OpenDatesQuery>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let from = query
        .from
        .unwrap_or_else(|| Utc::now().date_naive().format("%Y-%m-%d").to_string());
    let days = slot_service::get_open_dates_from(&pool, &activity_id, &from)
        .await
        .map_err(|e| error_response("open dates", e))?;
    Ok(Json(serde_json::json!({ "dates": days })))
}

pub async fn preview_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path((activity_id, slot_mark)): Path<(String, String)>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let preview = booking_service::preview_booking(
        &pool,
        &auth_user.id,
        &activity_id,
        &slot_mark,
        Utc::now(),
    )
    .await
    .map_err(|e| error_response("booking preview", e))?;
    Ok(Json(serde_json::json!(preview)))
}
