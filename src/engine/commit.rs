//! engine::commit
//!
//! Validate and commit one store against another.
//!
//! A commit reads both stores in full, runs the transaction over them and,
//! once every plugin has committed, copies the target store onto the
//! source store. END runs after the copy. If the copy fails the plugins
//! are told to abort and the source store is left as it was.

use thiserror::Error;
use tracing::{info, warn};

use crate::core::types::StoreName;
use crate::datastore::{Datastore, DatastoreError, ErrorKind};

use super::coordinator::{Coordinator, TransactionError};
use super::plugin::PluginRegistry;

/// Errors from commit and validate.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Datastore(#[from] DatastoreError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl CommitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommitError::Datastore(e) => e.kind(),
            CommitError::Transaction(_) => ErrorKind::Transaction,
        }
    }
}

/// Commit `target` into `source` through the plugins.
///
/// # Errors
///
/// - `Datastore` if either store cannot be read or the copy fails
/// - `Transaction` if a plugin fails; the source store is only written
///   when COMMIT succeeded, so an END failure still leaves it updated
pub fn candidate_commit(
    ds: &Datastore,
    coordinator: &mut Coordinator,
    registry: &mut PluginRegistry,
    source: &StoreName,
    target: &StoreName,
) -> Result<(), CommitError> {
    let from = ds.get(source, None)?.tree;
    let to = ds.get(target, None)?.tree;
    let mut tx = coordinator.transaction(from, to);
    info!(transaction = %tx.id(), source = %source, target = %target, "commit");

    coordinator.prepare(registry, &mut tx, ds.schema())?;
    coordinator.commit(registry, &mut tx)?;

    if let Err(err) = ds.copy(target, source) {
        warn!(transaction = %tx.id(), error = %err, "copy after commit failed");
        coordinator.abort(registry, &mut tx);
        return Err(err.into());
    }

    coordinator.end(registry, &mut tx)?;
    Ok(())
}

/// Validate `target` against `source` without committing.
pub fn candidate_validate(
    ds: &Datastore,
    coordinator: &mut Coordinator,
    registry: &mut PluginRegistry,
    source: &StoreName,
    target: &StoreName,
) -> Result<(), CommitError> {
    let from = ds.get(source, None)?.tree;
    let to = ds.get(target, None)?.tree;
    let mut tx = coordinator.transaction(from, to);
    info!(transaction = %tx.id(), source = %source, target = %target, "validate");

    coordinator.validate_only(registry, &mut tx, ds.schema())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tempfile::TempDir;

    use super::*;
    use crate::core::schema::{Schema, SchemaDef};
    use crate::core::types::EditOp;
    use crate::core::xml;
    use crate::engine::coordinator::Phase;
    use crate::engine::plugin::{Plugin, PluginError};
    use crate::engine::transaction::Transaction;

    /// Captures the diff sizes seen at validate and fails commit on demand.
    #[derive(Default)]
    struct Watcher {
        seen: Rc<RefCell<Vec<(usize, usize, usize)>>>,
        fail_commit: bool,
    }

    impl Plugin for Watcher {
        fn name(&self) -> &str {
            "watcher"
        }

        fn validate(&mut self, tx: &Transaction) -> Result<(), PluginError> {
            self.seen
                .borrow_mut()
                .push((tx.added().len(), tx.deleted().len(), tx.changed().len()));
            Ok(())
        }

        fn commit(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
            if self.fail_commit {
                Err(PluginError::new("device rejected configuration"))
            } else {
                Ok(())
            }
        }
    }

    fn setup() -> (TempDir, Datastore) {
        let dir = TempDir::new().unwrap();
        let schema = Schema::from_defs(vec![SchemaDef::container("system")
            .child(SchemaDef::leaf("hostname"))
            .child(SchemaDef::leaf("domain"))])
        .unwrap();
        let ds = Datastore::new(dir.path().to_path_buf(), schema);
        ds.create(&StoreName::running()).unwrap();
        ds.create(&StoreName::candidate()).unwrap();
        let edit = xml::parse_edit("<system><hostname>r1</hostname></system>").unwrap();
        ds.put(&StoreName::candidate(), EditOp::Merge, None, Some(&edit))
            .unwrap();
        (dir, ds)
    }

    fn hostname(ds: &Datastore, store: &StoreName) -> Option<String> {
        let result = ds.get(store, Some("/system/hostname")).ok()?;
        let system = result.tree.find(result.tree.root(), "system")?;
        result.tree.find_body(system, "hostname").map(str::to_string)
    }

    #[test]
    fn commit_copies_target_onto_source() {
        let (_dir, ds) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::new().with(Watcher {
            seen: seen.clone(),
            fail_commit: false,
        });
        let mut coordinator = Coordinator::new();
        candidate_commit(
            &ds,
            &mut coordinator,
            &mut registry,
            &StoreName::running(),
            &StoreName::candidate(),
        )
        .unwrap();
        assert_eq!(hostname(&ds, &StoreName::running()).as_deref(), Some("r1"));
        assert_eq!(*seen.borrow(), vec![(1, 0, 0)]);
    }

    #[test]
    fn failed_commit_leaves_source_untouched() {
        let (_dir, ds) = setup();
        let mut registry = PluginRegistry::new().with(Watcher {
            fail_commit: true,
            ..Default::default()
        });
        let mut coordinator = Coordinator::new();
        let err = candidate_commit(
            &ds,
            &mut coordinator,
            &mut registry,
            &StoreName::running(),
            &StoreName::candidate(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transaction);
        match err {
            CommitError::Transaction(e) => assert_eq!(e.phase, Phase::Commit),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hostname(&ds, &StoreName::running()), None);
    }

    #[test]
    fn validate_does_not_copy() {
        let (_dir, ds) = setup();
        let mut registry = PluginRegistry::new().with(Watcher::default());
        let mut coordinator = Coordinator::new();
        candidate_validate(
            &ds,
            &mut coordinator,
            &mut registry,
            &StoreName::running(),
            &StoreName::candidate(),
        )
        .unwrap();
        assert_eq!(hostname(&ds, &StoreName::running()), None);
    }

    #[test]
    fn missing_store_is_datastore_error() {
        let (_dir, ds) = setup();
        let mut registry = PluginRegistry::new();
        let mut coordinator = Coordinator::new();
        let err = candidate_commit(
            &ds,
            &mut coordinator,
            &mut registry,
            &StoreName::startup(),
            &StoreName::candidate(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
