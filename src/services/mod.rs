pub mod booking_rules;
pub mod booking_service;
pub mod credit_service;
pub mod error;
pub mod leaderboard_service;
pub mod slot_service;

pub use error::BookingError;
