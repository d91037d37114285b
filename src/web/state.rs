use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::services::leaderboard_service::LeaderboardCache;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub leaderboard: Arc<LeaderboardCache>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            leaderboard: Arc::new(LeaderboardCache::new()),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
