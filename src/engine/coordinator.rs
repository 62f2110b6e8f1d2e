//! engine::coordinator
//!
//! Drives plugins through the transaction phases.
//!
//! # Phase Protocol
//!
//! ```text
//! BEGIN -> VALIDATE -> COMPLETE -> COMMIT -> END
//!   |         |           |          |
//!   +---------+-----------+          +-> REVERTING -> ABORT
//!             |
//!             +-> ABORT
//! ```
//!
//! The coordinator MUST:
//! - Call plugins in registration order, except revert (reverse order)
//! - Stop a phase at the first failing plugin
//! - Compute the diff once, before any validate callback
//! - On commit failure at plugin `k`, revert plugins `k - 1` down to `0`
//!   and keep going when a revert fails
//! - Call abort on every plugin after a failure in BEGIN through COMMIT,
//!   ignoring its results
//! - Never revert or abort after a failure in END
//!
//! A failure without a message is honored and logged as a plugin bug.
//!
//! # Example
//!
//! ```
//! use xmldb::core::schema::Schema;
//! use xmldb::core::tree::Tree;
//! use xmldb::engine::coordinator::Coordinator;
//! use xmldb::engine::plugin::PluginRegistry;
//!
//! let mut coordinator = Coordinator::new();
//! let mut registry = PluginRegistry::new();
//! let mut tx = coordinator.transaction(Tree::new("config"), Tree::new("config"));
//! coordinator.run(&mut registry, &mut tx, &Schema::default()).unwrap();
//! assert!(tx.state().is_terminal());
//! ```

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::schema::SchemaProvider;
use crate::core::tree::Tree;
use crate::core::types::TransactionId;

use super::plugin::{Plugin, PluginError, PluginRegistry};
use super::transaction::{CommitState, Transaction};

/// Transaction phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    Validate,
    Complete,
    Commit,
    Revert,
    End,
    Abort,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Begin => "begin",
            Phase::Validate => "validate",
            Phase::Complete => "complete",
            Phase::Commit => "commit",
            Phase::Revert => "revert",
            Phase::End => "end",
            Phase::Abort => "abort",
        }
    }

    fn call(self, plugin: &mut dyn Plugin, tx: &Transaction) -> Result<(), PluginError> {
        match self {
            Phase::Begin => plugin.begin(tx),
            Phase::Validate => plugin.validate(tx),
            Phase::Complete => plugin.complete(tx),
            Phase::Commit => plugin.commit(tx),
            Phase::Revert => plugin.revert(tx),
            Phase::End => plugin.end(tx),
            Phase::Abort => plugin.abort(tx),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase failed in a plugin.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transaction {phase} failed in plugin '{plugin}': {message}")]
pub struct TransactionError {
    pub phase: Phase,
    pub plugin: String,
    pub message: String,
}

/// Outcome of the revert sweep after a failed commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertReport {
    /// Plugins whose revert succeeded, in call order.
    pub reverted: Vec<String>,
    /// Plugins whose revert failed, with their errors.
    pub failed: Vec<(String, PluginError)>,
}

impl RevertReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, plugin: String) {
        self.reverted.push(plugin);
    }

    pub fn record_failure(&mut self, plugin: String, error: PluginError) {
        self.failed.push((plugin, error));
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Whether every revert succeeded.
    pub fn complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.complete() {
            format!("Reverted {} plugins successfully", self.reverted.len())
        } else {
            format!(
                "Partial revert: {} succeeded, {} failed",
                self.reverted.len(),
                self.failed.len()
            )
        }
    }
}

/// Runs transactions and allocates their identifiers.
#[derive(Debug, Default)]
pub struct Coordinator {
    next_id: TransactionId,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transaction with the next identifier.
    pub fn transaction(&mut self, source: Tree, target: Tree) -> Transaction {
        let id = self.next_id;
        self.next_id = id.next();
        debug!(transaction = %id, "transaction created");
        Transaction::new(id, source, target)
    }

    /// Run BEGIN through END.
    ///
    /// # Errors
    ///
    /// The first plugin failure; the transaction's state tells whether it
    /// was aborted (failure up to COMMIT) or committed (failure in END).
    pub fn run(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
        schema: &dyn SchemaProvider,
    ) -> Result<(), TransactionError> {
        self.prepare(registry, tx, schema)?;
        self.commit(registry, tx)?;
        self.end(registry, tx)
    }

    /// Run BEGIN, VALIDATE and COMPLETE, then END; no commit.
    pub fn validate_only(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
        schema: &dyn SchemaProvider,
    ) -> Result<(), TransactionError> {
        self.prepare(registry, tx, schema)?;
        self.end(registry, tx)
    }

    /// Run BEGIN, VALIDATE and COMPLETE; abort on failure.
    pub fn prepare(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
        schema: &dyn SchemaProvider,
    ) -> Result<(), TransactionError> {
        self.phase(registry, tx, Phase::Begin)
            .map_err(|e| self.fail(registry, tx, e))?;
        tx.transition(CommitState::Begun);

        let diff = tx.compute_diff(schema);
        debug!(
            transaction = %tx.id(),
            added = diff.added.len(),
            deleted = diff.deleted.len(),
            changed = diff.changed.len(),
            "diff computed"
        );
        self.phase(registry, tx, Phase::Validate)
            .map_err(|e| self.fail(registry, tx, e))?;
        tx.transition(CommitState::Validated);

        self.phase(registry, tx, Phase::Complete)
            .map_err(|e| self.fail(registry, tx, e))?;
        tx.transition(CommitState::Completed);
        Ok(())
    }

    /// Run COMMIT; on failure revert the plugins that committed, then abort.
    pub fn commit(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
    ) -> Result<(), TransactionError> {
        for k in 0..registry.len() {
            let Some(plugin) = registry.get_mut(k) else {
                break;
            };
            if let Err(err) = Phase::Commit.call(plugin, tx) {
                let error = failure(Phase::Commit, plugin.name(), err);
                tx.transition(CommitState::CommitFailed(k));
                let report = self.revert(registry, tx, k);
                if report.has_failures() {
                    warn!(transaction = %tx.id(), "{}", report.summary());
                }
                tx.set_revert_report(report);
                return Err(self.fail(registry, tx, error));
            }
        }
        tx.transition(CommitState::Committed);
        info!(transaction = %tx.id(), "transaction committed");
        Ok(())
    }

    /// Run END; a failure is reported but the transaction stays committed.
    pub fn end(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
    ) -> Result<(), TransactionError> {
        let result = self.phase(registry, tx, Phase::End);
        tx.transition(CommitState::Ended);
        if let Err(err) = &result {
            warn!(transaction = %tx.id(), error = %err, "end phase failed");
        }
        result
    }

    /// Call abort on every plugin; failures are logged.
    pub fn abort(&self, registry: &mut PluginRegistry, tx: &mut Transaction) {
        for plugin in registry.iter_mut() {
            if let Err(err) = Phase::Abort.call(plugin, tx) {
                check_message(Phase::Abort, plugin.name(), &err);
                warn!(
                    transaction = %tx.id(),
                    plugin = plugin.name(),
                    error = %err,
                    "abort callback failed"
                );
            }
        }
        tx.transition(CommitState::Aborted);
        info!(transaction = %tx.id(), "transaction aborted");
    }

    fn phase(
        &self,
        registry: &mut PluginRegistry,
        tx: &Transaction,
        phase: Phase,
    ) -> Result<(), TransactionError> {
        debug!(transaction = %tx.id(), %phase, "phase start");
        for plugin in registry.iter_mut() {
            if let Err(err) = phase.call(plugin, tx) {
                return Err(failure(phase, plugin.name(), err));
            }
        }
        Ok(())
    }

    fn revert(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
        failed_at: usize,
    ) -> RevertReport {
        let mut report = RevertReport::new();
        for i in (0..failed_at).rev() {
            tx.transition(CommitState::Reverting(i));
            let Some(plugin) = registry.get_mut(i) else {
                continue;
            };
            let name = plugin.name().to_string();
            match Phase::Revert.call(plugin, tx) {
                Ok(()) => report.record_success(name),
                Err(err) => {
                    check_message(Phase::Revert, &name, &err);
                    warn!(transaction = %tx.id(), plugin = %name, error = %err, "revert failed");
                    report.record_failure(name, err);
                }
            }
        }
        report
    }

    fn fail(
        &self,
        registry: &mut PluginRegistry,
        tx: &mut Transaction,
        error: TransactionError,
    ) -> TransactionError {
        warn!(transaction = %tx.id(), error = %error, "transaction failed");
        self.abort(registry, tx);
        error
    }
}

fn failure(phase: Phase, plugin: &str, err: PluginError) -> TransactionError {
    check_message(phase, plugin, &err);
    TransactionError {
        phase,
        plugin: plugin.to_string(),
        message: err.to_string(),
    }
}

fn check_message(phase: Phase, plugin: &str, err: &PluginError) {
    if err.is_silent() {
        warn!(
            plugin,
            %phase,
            "plugin callback failed without reporting an error message"
        );
    }
}
