/// Read-only projection of the external identity service; consumed by the
/// leaderboard for display names.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct UserRow {
    pub user_id: String,
    pub display_name: String,
}
