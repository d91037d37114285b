use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::database::{card_repo, ledger_repo};
use crate::models::{CardRow, LedgerEntryRow};
use crate::services::BookingError;
use crate::web::middleware::auth::AuthenticatedUser;
use crate::web::routes::respond::{error_response, ApiError};

#[derive(Debug, Serialize)]
pub struct CardView {
    pub card_id: String,
    pub kind: String,
    pub total: i64,
    pub used: i64,
    pub remaining: i64,
    pub status: String,
    pub expires_at: Option<String>,
}

impl From<CardRow> for CardView {
    fn from(row: CardRow) -> Self {
        CardView {
            card_id: row.card_id,
            kind: row.kind,
            total: row.total,
            used: row.used,
            remaining: row.remaining,
            status: row.status,
            expires_at: row.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerEntryView {
    pub entry_id: String,
    pub kind: String,
    pub delta: i64,
    pub remaining_before: i64,
    pub remaining_after: i64,
    pub reason: String,
    pub related_id: Option<String>,
    pub created_at: String,
}

impl From<LedgerEntryRow> for LedgerEntryView {
    fn from(row: LedgerEntryRow) -> Self {
        LedgerEntryView {
            entry_id: row.entry_id,
            kind: row.kind,
            delta: row.delta,
            remaining_before: row.remaining_before,
            remaining_after: row.remaining_after,
            reason: row.reason,
            related_id: row.related_id,
            created_at: row.created_at,
        }
    }
}

pub async fn list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let cards = card_repo::list_user_cards(&pool, &auth_user.id)
        .await
        .map_err(|e| error_response("list cards", e.into()))?;
    let views: Vec<CardView> = cards.into_iter().map(CardView::from).collect();
    Ok(Json(serde_json::json!({ "cards": views })))
}

pub async fn ledger_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(card_id): Path<String>,
    State(pool): State<SqlitePool>,
) -> Result<Json<Value>, ApiError> {
    let card = card_repo::get_card(&pool, &card_id)
        .await
        .map_err(|e| error_response("load card", e.into()))?;
    // A foreign card id reads the same as a missing one.
    let owned = card.map(|c| c.user_id == auth_user.id).unwrap_or(false);
    if !owned {
        return Err(error_response("load card", BookingError::NotFound));
    }
    let entries = ledger_repo::list_entries(&pool, &card_id)
        .await
        .map_err(|e| error_response("card ledger", e.into()))?;
    let views: Vec<LedgerEntryView> = entries.into_iter().map(LedgerEntryView::from).collect();
    Ok(Json(serde_json::json!({ "entries": views })))
}
