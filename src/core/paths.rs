//! core::paths
//!
//! Centralized path routing for store files.
//!
//! # Storage Layout
//!
//! Every store lives directly under the configured database directory:
//! - `<dbdir>/<name>_db` - Store contents
//! - `<dbdir>/<name>_db.tmp` - Write staging file, renamed over the store
//!
//! No code outside this module should format store file names.
//!
//! # Example
//!
//! ```
//! use xmldb::core::paths::StorePaths;
//! use xmldb::core::types::StoreName;
//! use std::path::PathBuf;
//!
//! let paths = StorePaths::new(PathBuf::from("/var/lib/xmldb"));
//! assert_eq!(
//!     paths.store_file(&StoreName::running()),
//!     PathBuf::from("/var/lib/xmldb/running_db")
//! );
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::types::StoreName;

/// Path routing for store files under one database directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    dbdir: PathBuf,
}

impl StorePaths {
    pub fn new(dbdir: PathBuf) -> Self {
        Self { dbdir }
    }

    /// The database directory.
    pub fn dbdir(&self) -> &Path {
        &self.dbdir
    }

    /// Backing file of a store.
    pub fn store_file(&self, store: &StoreName) -> PathBuf {
        self.dbdir.join(format!("{}_db", store))
    }

    /// Staging file used for atomic writes of a store.
    pub fn temp_file(&self, store: &StoreName) -> PathBuf {
        self.dbdir.join(format!("{}_db.tmp", store))
    }

    /// Create the database directory if missing.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dbdir)
    }
}

/// Write `contents` to `path` through the staging file `temp`.
///
/// The staging file is synced before it is renamed over `path`, so readers
/// see either the old or the new contents, never a truncated file.
pub fn write_atomic(path: &Path, temp: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(temp, path)
}
