//! cli
//!
//! Command-line interface for xmldb.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and apply flag overrides
//! - Initialize logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers open a [`crate::datastore::Datastore`]
//! from the resolved configuration and call into the datastore or the
//! [`crate::engine`]. Errors are carried as `anyhow` errors with context
//! and printed once, by `main`.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::logging::{self, Profile};
use crate::ui::output::Verbosity;

/// Settings shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration with command-line overrides applied
    pub config: Config,
    pub verbosity: Verbosity,
}

impl Context {
    /// Resolve configuration for `cli`; flags override file values.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
        if let Some(dbdir) = &cli.dbdir {
            config.file.dbdir = Some(dbdir.clone());
        }
        if let Some(schema) = &cli.schema {
            config.file.schema = Some(schema.clone());
        }
        Ok(Self {
            config,
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        })
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let ctx = Context::from_cli(&cli)?;
    logging::init(Profile::select(cli.debug, ctx.config.log_format()));

    commands::dispatch(cli.command, &ctx)
}
