pub mod activity;
pub mod card;
pub mod day;
pub mod join;
pub mod ledger;
pub mod users;

pub use activity::{ActivityRow, ActivityStatus, CancelPolicy, CostMode, CostPolicy, FormField};
pub use card::{CardKind, CardRow, CardStatus};
pub use day::{DayRow, Slot, SlotCapacity, SlotStats};
pub use join::{CreditDeduction, JoinRow, JoinStatus};
pub use ledger::{LedgerEntryRow, LedgerKind};
pub use users::UserRow;
