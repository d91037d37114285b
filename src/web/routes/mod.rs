pub mod admin;
pub mod bookings;
pub mod cards;
pub mod leaderboard;
pub mod respond;
pub mod slots;

use axum::Json;
use serde_json::Value;

pub async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
