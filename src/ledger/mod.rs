//! Transaction records, their JSON-backed store, and derived statistics.

pub mod store;
pub mod summary;
pub mod transaction;

pub use store::{SortKey, SortOrder, TransactionStore};
pub use summary::{daily_totals, month_totals, statistics, Statistics};
pub use transaction::{Transaction, TransactionState, DATE_FORMAT};
