//! core
//!
//! Core domain types, trees, schemas, and codecs.
//!
//! # Modules
//!
//! - [`types`] - Strong types: StoreName, SessionId, EditOp, TransactionId
//! - [`tree`] - Arena-owned configuration trees and pass-local flag sets
//! - [`schema`] - Schema provider trait and the TOML-defined schema
//! - [`xml`] - Store text codec
//! - [`query`] - Query evaluator trait and the path-query subset
//! - [`ops`] - Advisory store locking
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for store files
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Trees own their nodes; dropping a tree frees it
//! - Algorithm state lives in the pass that needs it, not on nodes

pub mod config;
pub mod ops;
pub mod paths;
pub mod query;
pub mod schema;
pub mod tree;
pub mod types;
pub mod xml;
