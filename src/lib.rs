//! xmldb - a transactional, schema-directed XML configuration store
//!
//! Named stores (`running`, `candidate`, ...) hold one XML tree each and
//! live as files in a store directory. Edits are reconciled against the
//! stored tree under NETCONF-style operations; commits walk registered
//! plugins through a validate/commit transaction.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`engine`] - Transactions, plugins, commit and state collection
//! - [`datastore`] - Store files, edit reconciliation, reads, locks
//! - [`core`] - Tree, schema, XML codec, path queries, config, domain types
//! - [`logging`] - Tracing subscriber setup
//! - [`ui`] - Terminal output
//!
//! # Correctness Invariants
//!
//! 1. A failed edit never changes a store file
//! 2. Store files are replaced atomically
//! 3. A failed commit reverts every plugin that already committed
//! 4. Nodes an edit only passed through are not persisted

pub mod cli;
pub mod core;
pub mod datastore;
pub mod engine;
pub mod logging;
pub mod ui;
