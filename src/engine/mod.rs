//! engine
//!
//! Runs validate and commit transactions through registered plugins.
//!
//! # Architecture
//!
//! A transaction compares a source store with a target store. The
//! [`coordinator::Coordinator`] walks every registered [`plugin::Plugin`]
//! through the phases:
//!
//! ```text
//! BEGIN -> VALIDATE -> COMPLETE -> COMMIT -> END
//! ```
//!
//! Any failure before COMMIT aborts the transaction. A failure inside
//! COMMIT first reverts the plugins that already committed, in reverse
//! order, then aborts. END failures are reported but the transaction
//! stays committed.
//!
//! # Modules
//!
//! - [`plugin`] - Plugin trait and registry
//! - [`transaction`] - Transaction value, diff and state history
//! - [`coordinator`] - Phase protocol and revert sweep
//! - [`commit`] - Store-level commit and validate
//! - [`state`] - Operational state collection and plugin reset
//! - [`plugins`] - Built-in plugins
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use xmldb::core::schema::Schema;
//! use xmldb::core::types::StoreName;
//! use xmldb::datastore::Datastore;
//! use xmldb::engine::commit::candidate_commit;
//! use xmldb::engine::coordinator::Coordinator;
//! use xmldb::engine::plugin::PluginRegistry;
//! use xmldb::engine::plugins::TransactionLogPlugin;
//!
//! let ds = Datastore::new(PathBuf::from("/var/lib/xmldb"), Schema::default());
//! let mut registry = PluginRegistry::new().with(TransactionLogPlugin::new());
//! let mut coordinator = Coordinator::new();
//!
//! candidate_commit(
//!     &ds,
//!     &mut coordinator,
//!     &mut registry,
//!     &StoreName::running(),
//!     &StoreName::candidate(),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod commit;
pub mod coordinator;
pub mod plugin;
pub mod plugins;
pub mod state;
pub mod transaction;

pub use commit::{candidate_commit, candidate_validate, CommitError};
pub use coordinator::{Coordinator, Phase, RevertReport, TransactionError};
pub use plugin::{Plugin, PluginError, PluginRegistry};
pub use state::{collect_state, reset_plugins, ResetError, StateData};
pub use transaction::{CommitState, Transaction};
