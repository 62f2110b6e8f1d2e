//! core::ops
//!
//! Store access coordination.
//!
//! # Modules
//!
//! - [`lock`] - Advisory per-store lock table
//!
//! # Architecture
//!
//! A client that mutates a store:
//! 1. Locks the store under its session
//! 2. Performs its edits or commit
//! 3. Unlocks the store, or releases everything with `unlock_all` when the
//!    session ends
//!
//! The table is advisory. Nothing in the datastore consults it on its own.

pub mod lock;

pub use lock::LockTable;
