pub mod activity_repo;
pub mod card_repo;
pub mod day_repo;
pub mod join_repo;
pub mod ledger_repo;
pub mod schema;
pub mod user_repo;
