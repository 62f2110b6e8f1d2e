//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Validation
//!
//! Config values are validated after parsing: store names must be valid
//! and unique, and paths must not be empty.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::StoreName;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Contents of a config file.
///
/// # Example
///
/// ```toml
/// dbdir = "/var/lib/xmldb"
/// schema = "/etc/xmldb/schema.toml"
/// stores = ["running", "candidate", "startup", "tmp"]
/// log_format = "pretty"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory holding the store files
    pub dbdir: Option<PathBuf>,

    /// Schema definition file
    pub schema: Option<PathBuf>,

    /// Store set
    pub stores: Option<Vec<StoreName>>,

    /// Log output format
    pub log_format: Option<LogFormat>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dbdir) = &self.dbdir {
            if dbdir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue("dbdir cannot be empty".into()));
            }
        }
        if let Some(schema) = &self.schema {
            if schema.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue("schema cannot be empty".into()));
            }
        }
        if let Some(stores) = &self.stores {
            if stores.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "stores must name at least one store".into(),
                ));
            }
            let mut seen = HashSet::new();
            for store in stores {
                if !seen.insert(store) {
                    return Err(ConfigError::InvalidValue(format!(
                        "duplicate store '{}'",
                        store
                    )));
                }
            }
        }
        Ok(())
    }
}
