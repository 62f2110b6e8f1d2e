//! engine::transaction
//!
//! The value handed to every plugin callback.
//!
//! A [`Transaction`] owns the source tree (the store before the change),
//! the target tree (the store after it) and the diff between them. The
//! diff is computed once, when validation starts, and is read-only after
//! that. Dropping the transaction releases all of it.

use std::cell::OnceCell;
use std::fmt;

use crate::core::schema::SchemaProvider;
use crate::core::tree::{NodeId, Tree};
use crate::core::types::TransactionId;
use crate::datastore::diff::{diff, DiffSet};

use super::coordinator::RevertReport;

/// Where a transaction is in the phase protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Created,
    Begun,
    Validated,
    Completed,
    Committed,
    /// Plugin `k` failed its commit callback.
    CommitFailed(usize),
    /// Reverting plugin `i`; runs from `k - 1` down to `0`.
    Reverting(usize),
    Aborted,
    Ended,
}

impl CommitState {
    /// Whether the transaction has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommitState::Aborted | CommitState::Ended)
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitState::Created => write!(f, "created"),
            CommitState::Begun => write!(f, "begun"),
            CommitState::Validated => write!(f, "validated"),
            CommitState::Completed => write!(f, "completed"),
            CommitState::Committed => write!(f, "committed"),
            CommitState::CommitFailed(k) => write!(f, "commit failed at plugin {}", k),
            CommitState::Reverting(i) => write!(f, "reverting plugin {}", i),
            CommitState::Aborted => write!(f, "aborted"),
            CommitState::Ended => write!(f, "ended"),
        }
    }
}

/// A validate or commit transaction.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    source: Tree,
    target: Tree,
    diff: OnceCell<DiffSet>,
    history: Vec<CommitState>,
    revert: Option<RevertReport>,
}

impl Transaction {
    /// Create a transaction; identifiers come from the coordinator.
    pub(crate) fn new(id: TransactionId, source: Tree, target: Tree) -> Self {
        Self {
            id,
            source,
            target,
            diff: OnceCell::new(),
            history: vec![CommitState::Created],
            revert: None,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The store content before the change.
    pub fn source(&self) -> &Tree {
        &self.source
    }

    /// The store content after the change.
    pub fn target(&self) -> &Tree {
        &self.target
    }

    /// The diff, once validation has started.
    pub fn diff(&self) -> Option<&DiffSet> {
        self.diff.get()
    }

    /// Nodes of the target with no counterpart in the source.
    pub fn added(&self) -> &[NodeId] {
        self.diff().map(|d| d.added.as_slice()).unwrap_or(&[])
    }

    /// Nodes of the source with no counterpart in the target.
    pub fn deleted(&self) -> &[NodeId] {
        self.diff().map(|d| d.deleted.as_slice()).unwrap_or(&[])
    }

    /// Leaves present in both trees with different values, as `(source, target)`.
    pub fn changed(&self) -> &[(NodeId, NodeId)] {
        self.diff().map(|d| d.changed.as_slice()).unwrap_or(&[])
    }

    pub fn state(&self) -> CommitState {
        self.history
            .last()
            .copied()
            .unwrap_or(CommitState::Created)
    }

    /// Every state the transaction has passed through, oldest first.
    pub fn history(&self) -> &[CommitState] {
        &self.history
    }

    /// Outcome of the revert sweep, if a commit failed.
    pub fn revert_report(&self) -> Option<&RevertReport> {
        self.revert.as_ref()
    }

    /// Compute the diff. Later calls return the first result.
    pub(crate) fn compute_diff(&self, schema: &dyn SchemaProvider) -> &DiffSet {
        self.diff
            .get_or_init(|| diff(&self.source, &self.target, schema))
    }

    pub(crate) fn transition(&mut self, state: CommitState) {
        self.history.push(state);
    }

    pub(crate) fn set_revert_report(&mut self, report: RevertReport) {
        self.revert = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Schema, SchemaDef};
    use crate::core::xml;

    fn schema() -> Schema {
        Schema::from_defs(vec![SchemaDef::container("system")
            .child(SchemaDef::leaf("hostname"))
            .child(SchemaDef::leaf("domain"))])
        .unwrap()
    }

    fn transaction() -> Transaction {
        Transaction::new(
            TransactionId::new(7),
            xml::parse_store("<config><system><hostname>a</hostname></system></config>").unwrap(),
            xml::parse_store(
                "<config><system><hostname>b</hostname><domain>lan</domain></system></config>",
            )
            .unwrap(),
        )
    }

    #[test]
    fn diff_empty_until_computed() {
        let tx = transaction();
        assert!(tx.diff().is_none());
        assert!(tx.added().is_empty());
        assert!(tx.changed().is_empty());
    }

    #[test]
    fn diff_computed_once() {
        let tx = transaction();
        let schema = schema();
        let first = tx.compute_diff(&schema).clone();
        assert_eq!(first.added.len(), 1);
        assert_eq!(first.changed.len(), 1);
        // A different schema would classify differently; the first result sticks.
        let second = tx.compute_diff(&Schema::default());
        assert_eq!(&first, second);
        assert_eq!(tx.target().name(tx.added()[0]), "domain");
    }

    #[test]
    fn history_starts_created() {
        let mut tx = transaction();
        assert_eq!(tx.id().get(), 7);
        assert_eq!(tx.state(), CommitState::Created);
        tx.transition(CommitState::Begun);
        assert_eq!(tx.history(), &[CommitState::Created, CommitState::Begun]);
        assert!(!tx.state().is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(CommitState::CommitFailed(2).to_string(), "commit failed at plugin 2");
        assert_eq!(CommitState::Reverting(0).to_string(), "reverting plugin 0");
    }
}
