//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order, first existing file wins:
//! 1. Explicit path (`--config`), which must exist
//! 2. `$XMLDB_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/xmldb/config.toml`
//! 4. `~/.xmldb/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use xmldb::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("Store directory: {}", config.dbdir().display());
//! for store in config.stores() {
//!     println!("store: {}", store);
//! }
//! ```

pub mod schema;

pub use schema::{FileConfig, LogFormat};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::types::StoreName;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "XMLDB_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file
    pub file: FileConfig,
    /// Path the file was loaded from (if any)
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit path is missing, or if a config
    /// file exists but cannot be parsed or validated. Missing default
    /// locations are not an error (defaults are used).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let env = |key: &str| std::env::var(key).ok();
        for path in Self::search_paths(env, dirs::home_dir()) {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Default search locations, in precedence order.
    fn search_paths(
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = env(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Some(xdg_home) = env("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("xmldb/config.toml"));
        }
        if let Some(home) = home {
            paths.push(home.join(".xmldb/config.toml"));
        }
        paths
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Directory holding the store files.
    ///
    /// Defaults to `<local data dir>/xmldb`, or `./xmldb` when the platform
    /// has no data directory.
    pub fn dbdir(&self) -> PathBuf {
        self.file.dbdir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("xmldb"))
                .unwrap_or_else(|| PathBuf::from("xmldb"))
        })
    }

    /// Schema definition file, if configured.
    pub fn schema_path(&self) -> Option<&Path> {
        self.file.schema.as_deref()
    }

    /// Configured store set (default: running, candidate, startup, tmp).
    pub fn stores(&self) -> Vec<StoreName> {
        self.file.stores.clone().unwrap_or_else(StoreName::defaults)
    }

    pub fn log_format(&self) -> LogFormat {
        self.file.log_format.unwrap_or_default()
    }

    /// Get the path the config was loaded from (if any).
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
