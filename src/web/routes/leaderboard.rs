use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::services::leaderboard_service::{self, LeaderboardScope, DEFAULT_LIMIT};
use crate::services::BookingError;
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::routes::respond::{error_response, ApiError};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct LeaderboardQuery {
    pub scope: Option<String>,
    pub limit: Option<i64>,
}

pub async fn ranking_handler(
    Extension(_auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let scope = match query.scope.as_deref() {
        None => LeaderboardScope::All,
        Some(raw) => LeaderboardScope::parse(raw).ok_or_else(|| {
            error_response(
                "leaderboard",
                BookingError::Validation(format!("unknown scope: {raw}")),
            )
        })?,
    };
    let entries = leaderboard_service::get_ranking(
        &state.pool,
        &state.leaderboard,
        scope,
        query.limit.unwrap_or(DEFAULT_LIMIT),
        Utc::now(),
    )
    .await
    .map_err(|e| error_response("leaderboard", e))?;
    Ok(Json(serde_json::json!({
        "scope": scope.as_str(),
        "ranking": entries,
    })))
}
