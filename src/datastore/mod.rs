//! datastore
//!
//! Named XML stores backed by files.
//!
//! # Modules
//!
//! - [`api_path`] - Path resolver for key-annotated paths
//! - [`modify`] - Edit reconciliation and speculative pruning
//! - [`diff`] - Difference vectors between two trees
//! - [`get`] - Read pipeline (query, defaults, order, sanity)
//! - [`error`] - Error type and classification
//!
//! # Architecture
//!
//! Every `get` and `put` loads its store from disk and drops the tree
//! afterwards; nothing is cached. `put` writes through a staging file that
//! is renamed over the store, and only after the whole edit succeeded.
//! A failed edit leaves the store file untouched.
//!
//! The datastore owns its [`LockTable`]. Locks are advisory: `get` and
//! `put` never consult them.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use xmldb::core::schema::{Schema, SchemaDef};
//! use xmldb::core::types::{EditOp, StoreName};
//! use xmldb::core::xml;
//! use xmldb::datastore::Datastore;
//!
//! let schema = Schema::from_defs(vec![
//!     SchemaDef::container("system").child(SchemaDef::leaf("hostname")),
//! ])?;
//! let ds = Datastore::new(PathBuf::from("/var/lib/xmldb"), schema);
//!
//! ds.create(&StoreName::candidate())?;
//! let edit = xml::parse_edit("<system><hostname>r1</hostname></system>")?;
//! ds.put(&StoreName::candidate(), EditOp::Merge, None, Some(&edit))?;
//!
//! let result = ds.get(&StoreName::candidate(), Some("/system/hostname"))?;
//! println!("{}", xml::to_string(&result.tree));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod api_path;
pub mod diff;
pub mod error;
pub mod get;
pub mod modify;

pub use diff::DiffSet;
pub use error::{DatastoreError, ErrorKind};
pub use get::GetResult;

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::ops::lock::LockTable;
use crate::core::paths::{write_atomic, StorePaths};
use crate::core::query::{NamespaceContext, PathQuery, QueryEvaluator};
use crate::core::schema::{Schema, SchemaProvider};
use crate::core::tree::Tree;
use crate::core::types::{EditOp, SessionId, StoreName};
use crate::core::xml;

/// A set of named stores under one directory.
pub struct Datastore {
    paths: StorePaths,
    stores: Vec<StoreName>,
    schema: Box<dyn SchemaProvider>,
    evaluator: PathQuery,
    locks: LockTable,
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("paths", &self.paths)
            .field("stores", &self.stores)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl Datastore {
    /// Datastore over `dbdir` with the default store set and the path-query
    /// evaluator.
    pub fn new(dbdir: PathBuf, schema: impl SchemaProvider + 'static) -> Self {
        Self {
            paths: StorePaths::new(dbdir),
            stores: StoreName::defaults(),
            schema: Box::new(schema),
            evaluator: PathQuery,
            locks: LockTable::new(),
        }
    }

    /// Build a datastore from configuration, loading the schema file if one
    /// is configured (an empty schema otherwise).
    pub fn from_config(config: &Config) -> Result<Self, DatastoreError> {
        let schema = match config.schema_path() {
            Some(path) => Schema::load(path)?,
            None => Schema::default(),
        };
        Ok(Self::new(config.dbdir(), schema).with_stores(config.stores()))
    }

    /// Replace the store set.
    pub fn with_stores(mut self, stores: Vec<StoreName>) -> Self {
        self.stores = stores;
        self
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn stores(&self) -> &[StoreName] {
        &self.stores
    }

    pub fn schema(&self) -> &dyn SchemaProvider {
        self.schema.as_ref()
    }

    pub fn evaluator(&self) -> &dyn QueryEvaluator {
        &self.evaluator
    }

    fn check_store(&self, store: &StoreName) -> Result<(), DatastoreError> {
        if self.stores.contains(store) {
            Ok(())
        } else {
            Err(DatastoreError::UnknownStore(store.to_string()))
        }
    }

    /// Backing file of a configured store.
    fn existing_file(&self, store: &StoreName) -> Result<PathBuf, DatastoreError> {
        self.check_store(store)?;
        let file = self.paths.store_file(store);
        if !file.exists() {
            return Err(DatastoreError::StoreNotFound(store.clone()));
        }
        Ok(file)
    }

    /// Create an empty store if it does not exist yet.
    pub fn create(&self, store: &StoreName) -> Result<(), DatastoreError> {
        self.check_store(store)?;
        self.paths
            .ensure_dir()
            .map_err(|e| DatastoreError::io(self.paths.dbdir(), e))?;
        let file = self.paths.store_file(store);
        if !file.exists() {
            fs::File::create(&file).map_err(|e| DatastoreError::io(&file, e))?;
            info!(store = %store, "created store");
        }
        Ok(())
    }

    /// Check if a store's backing file exists.
    pub fn exists(&self, store: &StoreName) -> Result<bool, DatastoreError> {
        self.check_store(store)?;
        Ok(self.paths.store_file(store).exists())
    }

    /// Remove a store's backing file.
    pub fn delete(&self, store: &StoreName) -> Result<(), DatastoreError> {
        self.check_store(store)?;
        let file = self.paths.store_file(store);
        fs::remove_file(&file).map_err(|e| DatastoreError::io(&file, e))?;
        info!(store = %store, "deleted store");
        Ok(())
    }

    /// Copy the contents of `from` over `to`, creating `to` if needed.
    pub fn copy(&self, from: &StoreName, to: &StoreName) -> Result<(), DatastoreError> {
        let source = self.existing_file(from)?;
        self.check_store(to)?;
        let contents = fs::read(&source).map_err(|e| DatastoreError::io(&source, e))?;
        self.write_bytes(to, &contents)?;
        info!(from = %from, to = %to, "copied store");
        Ok(())
    }

    /// Load a store into a tree rooted at `config`.
    pub fn load(&self, store: &StoreName) -> Result<Tree, DatastoreError> {
        let file = self.existing_file(store)?;
        let text = fs::read_to_string(&file).map_err(|e| DatastoreError::io(&file, e))?;
        xml::parse_store(&text).map_err(|source| DatastoreError::Xml {
            store: store.clone(),
            source,
        })
    }

    fn write_bytes(&self, store: &StoreName, contents: &[u8]) -> Result<(), DatastoreError> {
        let file = self.paths.store_file(store);
        write_atomic(&file, &self.paths.temp_file(store), contents)
            .map_err(|e| DatastoreError::io(&file, e))
    }

    /// Persist a tree as the contents of a store.
    pub fn write(&self, store: &StoreName, tree: &Tree) -> Result<(), DatastoreError> {
        self.check_store(store)?;
        self.write_bytes(store, xml::to_string(tree).as_bytes())
    }

    /// Read a store, optionally filtered by a query.
    pub fn get(&self, store: &StoreName, query: Option<&str>) -> Result<GetResult, DatastoreError> {
        self.get_with(store, &NamespaceContext::new(), query)
    }

    /// Read a store with namespace bindings for the query.
    pub fn get_with(
        &self,
        store: &StoreName,
        ns: &NamespaceContext,
        query: Option<&str>,
    ) -> Result<GetResult, DatastoreError> {
        debug!(store = %store, query = query.unwrap_or("/"), "get");
        let tree = self.load(store)?;
        get::prepare(tree, self.schema(), self.evaluator(), ns, query)
    }

    /// Apply an edit to a store.
    ///
    /// `path` selects the node the edit root stands for; without a path it
    /// stands for the store root. `delete` and `remove` need no edit tree.
    ///
    /// The edited tree is checked before it is written: every element needs
    /// a configuration schema node and every list entry its key leaves.
    ///
    /// # Errors
    ///
    /// Any load, resolve, modify or check error. On error the store file is
    /// left untouched.
    pub fn put(
        &self,
        store: &StoreName,
        op: EditOp,
        path: Option<&str>,
        edit: Option<&Tree>,
    ) -> Result<(), DatastoreError> {
        debug!(store = %store, op = %op, path = path.unwrap_or("/"), "put");
        let mut tree = self.load(store)?;
        modify::apply(&mut tree, self.schema(), op, path, edit)?;
        get::populate(&mut tree, self.schema())?;
        get::config_only(&tree, self.schema())?;
        get::sanity(&tree, self.schema())?;
        self.write(store, &tree)
    }

    /// Record `session` as the holder of `store`.
    pub fn lock(&mut self, store: &StoreName, session: SessionId) -> Result<(), DatastoreError> {
        self.check_store(store)?;
        self.locks.lock(store, session);
        debug!(store = %store, session = %session, "locked");
        Ok(())
    }

    pub fn unlock(&mut self, store: &StoreName) -> Result<(), DatastoreError> {
        self.check_store(store)?;
        self.locks.unlock(store);
        debug!(store = %store, "unlocked");
        Ok(())
    }

    /// Release every store held by `session`.
    pub fn unlock_all(&mut self, session: SessionId) -> Vec<StoreName> {
        self.locks.unlock_all(session)
    }

    /// Holder of `store`, or [`SessionId::NONE`].
    pub fn is_locked(&self, store: &StoreName) -> Result<SessionId, DatastoreError> {
        self.check_store(store)?;
        Ok(self.locks.is_locked(store))
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::SchemaDef;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::from_defs(vec![SchemaDef::container("system")
            .child(SchemaDef::leaf("hostname"))
            .child(SchemaDef::leaf_list("dns"))])
        .unwrap()
    }

    fn setup() -> (TempDir, Datastore) {
        let temp = TempDir::new().unwrap();
        let ds = Datastore::new(temp.path().join("db"), schema());
        (temp, ds)
    }

    mod administration {
        use super::*;

        #[test]
        fn create_exists_delete() {
            let (_temp, ds) = setup();
            let store = StoreName::candidate();
            assert!(!ds.exists(&store).unwrap());
            ds.create(&store).unwrap();
            assert!(ds.exists(&store).unwrap());
            assert!(ds.paths().store_file(&store).ends_with("candidate_db"));
            ds.delete(&store).unwrap();
            assert!(!ds.exists(&store).unwrap());
        }

        #[test]
        fn create_keeps_existing_content() {
            let (_temp, ds) = setup();
            let store = StoreName::running();
            ds.create(&store).unwrap();
            let edit = xml::parse_edit("<system><hostname>r1</hostname></system>").unwrap();
            ds.put(&store, EditOp::Merge, None, Some(&edit)).unwrap();
            ds.create(&store).unwrap();
            let tree = ds.load(&store).unwrap();
            assert!(tree.find(tree.root(), "system").is_some());
        }

        #[test]
        fn delete_missing_is_io_error() {
            let (_temp, ds) = setup();
            let err = ds.delete(&StoreName::tmp()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Io);
        }

        #[test]
        fn unknown_store_rejected() {
            let (_temp, ds) = setup();
            let other = StoreName::new("other").unwrap();
            assert!(matches!(
                ds.create(&other),
                Err(DatastoreError::UnknownStore(_))
            ));
            assert!(matches!(ds.exists(&other), Err(DatastoreError::UnknownStore(_))));
        }

        #[test]
        fn custom_store_set() {
            let temp = TempDir::new().unwrap();
            let other = StoreName::new("other").unwrap();
            let ds = Datastore::new(temp.path().to_path_buf(), schema())
                .with_stores(vec![other.clone()]);
            ds.create(&other).unwrap();
            assert!(ds.create(&StoreName::running()).is_err());
        }

        #[test]
        fn copy_replaces_target() {
            let (_temp, ds) = setup();
            ds.create(&StoreName::candidate()).unwrap();
            let edit = xml::parse_edit("<system><hostname>r1</hostname></system>").unwrap();
            ds.put(&StoreName::candidate(), EditOp::Merge, None, Some(&edit))
                .unwrap();

            ds.copy(&StoreName::candidate(), &StoreName::running()).unwrap();

            assert_eq!(
                ds.load(&StoreName::running()).unwrap(),
                ds.load(&StoreName::candidate()).unwrap()
            );
        }

        #[test]
        fn copy_from_missing_store() {
            let (_temp, ds) = setup();
            let err = ds.copy(&StoreName::startup(), &StoreName::running()).unwrap_err();
            assert!(matches!(err, DatastoreError::StoreNotFound(_)));
        }
    }

    mod reading_and_writing {
        use super::*;

        #[test]
        fn get_missing_store_is_argument_error() {
            let (_temp, ds) = setup();
            let err = ds.get(&StoreName::running(), None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Argument);
        }

        #[test]
        fn empty_store_reads_as_empty_config() {
            let (_temp, ds) = setup();
            ds.create(&StoreName::running()).unwrap();
            let result = ds.get(&StoreName::running(), None).unwrap();
            assert_eq!(result.tree.name(result.tree.root()), "config");
            assert!(!result.tree.has_elements(result.tree.root()));
        }

        #[test]
        fn failed_put_leaves_file_untouched() {
            let (_temp, ds) = setup();
            let store = StoreName::running();
            ds.create(&store).unwrap();
            let edit = xml::parse_edit("<system><hostname>r1</hostname></system>").unwrap();
            ds.put(&store, EditOp::Merge, None, Some(&edit)).unwrap();
            let before = fs::read(ds.paths().store_file(&store)).unwrap();

            let err = ds
                .put(&store, EditOp::Delete, Some("/system/dns=8.8.8.8"), None)
                .unwrap_err();

            assert!(matches!(err, DatastoreError::DoesNotExist(_)));
            assert_eq!(fs::read(ds.paths().store_file(&store)).unwrap(), before);
        }

        #[test]
        fn malformed_store_file() {
            let (_temp, ds) = setup();
            ds.create(&StoreName::running()).unwrap();
            fs::write(ds.paths().store_file(&StoreName::running()), "<a/><b/>").unwrap();
            let err = ds.get(&StoreName::running(), None).unwrap_err();
            assert!(matches!(err, DatastoreError::Xml { .. }));
        }

        #[test]
        fn written_file_is_indented() {
            let (_temp, ds) = setup();
            let store = StoreName::running();
            ds.create(&store).unwrap();
            let edit = xml::parse_edit("<system><hostname>r1</hostname></system>").unwrap();
            ds.put(&store, EditOp::Merge, None, Some(&edit)).unwrap();
            let text = fs::read_to_string(ds.paths().store_file(&store)).unwrap();
            assert_eq!(
                text,
                "<config>\n  <system>\n    <hostname>r1</hostname>\n  </system>\n</config>\n"
            );
        }
    }

    mod locking {
        use super::*;

        #[test]
        fn lock_lifecycle() {
            let (_temp, mut ds) = setup();
            let s = SessionId::new(11);
            ds.lock(&StoreName::candidate(), s).unwrap();
            assert_eq!(ds.is_locked(&StoreName::candidate()).unwrap(), s);
            ds.unlock(&StoreName::candidate()).unwrap();
            assert!(ds.is_locked(&StoreName::candidate()).unwrap().is_none());
        }

        #[test]
        fn unlock_all_for_session() {
            let (_temp, mut ds) = setup();
            ds.lock(&StoreName::candidate(), SessionId::new(1)).unwrap();
            ds.lock(&StoreName::running(), SessionId::new(1)).unwrap();
            assert_eq!(ds.unlock_all(SessionId::new(1)).len(), 2);
            assert_eq!(ds.locks().held().count(), 0);
        }

        #[test]
        fn lock_unknown_store() {
            let (_temp, mut ds) = setup();
            let other = StoreName::new("other").unwrap();
            assert!(ds.lock(&other, SessionId::new(1)).is_err());
        }
    }
}
