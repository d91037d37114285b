use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::database::join_repo;
use crate::services::BookingError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardScope {
    All,
    Last30Days,
}

impl LeaderboardScope {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaderboardScope::All => "all",
            LeaderboardScope::Last30Days => "last30days",
        }
    }

    pub fn parse(input: &str) -> Option<LeaderboardScope> {
        match input {
            "all" => Some(LeaderboardScope::All),
            "last30days" => Some(LeaderboardScope::Last30Days),
            _ => None,
        }
    }

    // The all-time board moves slowly, the monthly one is what people
    // refresh after a session.
    fn ttl(self) -> Duration {
        match self {
            LeaderboardScope::All => Duration::from_secs(24 * 60 * 60),
            LeaderboardScope::Last30Days => Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub checkin_count: i64,
    pub rank: i64,
}

struct CachedBoard {
    computed_at: Instant,
    limit: i64,
    entries: Vec<LeaderboardEntry>,
}

/// In-process ranking cache. Recomputed from scratch on miss or staleness;
/// `invalidate` drops everything so the next read recomputes.
#[derive(Default)]
pub struct LeaderboardCache {
    boards: Mutex<HashMap<LeaderboardScope, CachedBoard>>,
}

impl LeaderboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        self.boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn get_fresh(&self, scope: LeaderboardScope, limit: i64) -> Option<Vec<LeaderboardEntry>> {
        let boards = self.boards.lock().unwrap_or_else(PoisonError::into_inner);
        let board = boards.get(&scope)?;
        if board.computed_at.elapsed() >= scope.ttl() || board.limit < limit {
            return None;
        }
        let mut entries = board.entries.clone();
        entries.truncate(limit as usize);
        Some(entries)
    }

    fn store(&self, scope: LeaderboardScope, limit: i64, entries: Vec<LeaderboardEntry>) {
        self.boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                scope,
                CachedBoard {
                    computed_at: Instant::now(),
                    limit,
                    entries,
                },
            );
    }
}

/// Check-in ranking for a scope. Counts joins that are still succeeded and
/// checked in, grouped per user, descending, ties broken by user id
/// ascending. Served from the cache while fresh.
pub async fn get_ranking(
    pool: &SqlitePool,
    cache: &LeaderboardCache,
    scope: LeaderboardScope,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<LeaderboardEntry>, BookingError> {
    let limit = limit.clamp(1, MAX_LIMIT);
    if let Some(entries) = cache.get_fresh(scope, limit) {
        return Ok(entries);
    }

    let since_day = match scope {
        LeaderboardScope::All => None,
        LeaderboardScope::Last30Days => Some(
            (now - chrono::Duration::days(30))
                .date_naive()
                .format("%Y-%m-%d")
                .to_string(),
        ),
    };
    let rows = join_repo::checkin_counts(pool, since_day.as_deref(), limit).await?;
    let entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| LeaderboardEntry {
            display_name: row.display_name.unwrap_or_else(|| row.user_id.clone()),
            user_id: row.user_id,
            checkin_count: row.checkin_count,
            rank: idx as i64 + 1,
        })
        .collect();

    cache.store(scope, limit, entries.clone());
    Ok(entries)
}
