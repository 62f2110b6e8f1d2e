//! engine::plugins
//!
//! Plugins shipped with the store.

pub mod transaction_log;

pub use transaction_log::TransactionLogPlugin;
