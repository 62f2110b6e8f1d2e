//! Logs every transaction callback.
//!
//! Each phase emits one `debug!` event carrying the transaction id and the
//! diff sizes; run with `--debug` or `RUST_LOG=xmldb=debug` to see them.

use tracing::debug;

use crate::core::xml;
use crate::engine::plugin::{Plugin, PluginError};
use crate::engine::transaction::Transaction;

/// A plugin that only logs.
#[derive(Debug, Default)]
pub struct TransactionLogPlugin {
    /// Also log the changed nodes themselves.
    verbose: bool,
    events: usize,
}

impl TransactionLogPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self {
            verbose: true,
            events: 0,
        }
    }

    /// Number of callbacks seen so far.
    pub fn events(&self) -> usize {
        self.events
    }

    fn log(&mut self, phase: &str, tx: &Transaction) -> Result<(), PluginError> {
        self.events += 1;
        debug!(
            transaction = %tx.id(),
            phase,
            added = tx.added().len(),
            deleted = tx.deleted().len(),
            changed = tx.changed().len(),
            "transaction callback"
        );
        if self.verbose {
            for node in tx.added() {
                debug!(transaction = %tx.id(), "added: {}", xml::node_to_string(tx.target(), *node).trim_end());
            }
            for node in tx.deleted() {
                debug!(transaction = %tx.id(), "deleted: {}", xml::node_to_string(tx.source(), *node).trim_end());
            }
            for (from, to) in tx.changed() {
                debug!(
                    transaction = %tx.id(),
                    path = %tx.target().path_of(*to),
                    from = tx.source().body(*from).unwrap_or(""),
                    to = tx.target().body(*to).unwrap_or(""),
                    "changed"
                );
            }
        }
        Ok(())
    }
}

impl Plugin for TransactionLogPlugin {
    fn name(&self) -> &str {
        "transaction-log"
    }

    fn begin(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("begin", tx)
    }

    fn validate(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("validate", tx)
    }

    fn complete(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("complete", tx)
    }

    fn commit(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("commit", tx)
    }

    fn revert(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("revert", tx)
    }

    fn end(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("end", tx)
    }

    fn abort(&mut self, tx: &Transaction) -> Result<(), PluginError> {
        self.log("abort", tx)
    }
}
