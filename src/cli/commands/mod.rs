//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the datastore described by the context
//! 2. Calls the datastore or the engine
//! 3. Formats and displays output
//!
//! Handlers hold no state between invocations; every run starts from the
//! store files on disk.

mod commit;
mod copy;
mod delete;
mod exists;
mod get;
mod init;
mod put;

pub use commit::{commit, validate};
pub use copy::copy;
pub use delete::delete;
pub use exists::exists;
pub use get::get;
pub use init::init;
pub use put::put;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::datastore::Datastore;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { store } => init(ctx, &store),
        Command::Get { store, query, json } => get(ctx, &store, query.as_deref(), json),
        Command::Put {
            store,
            op,
            path,
            file,
        } => put(ctx, &store, op, path.as_deref(), file.as_deref()),
        Command::Copy { from, to } => copy(ctx, &from, &to),
        Command::Delete { store } => delete(ctx, &store),
        Command::Exists { store } => exists(ctx, &store),
        Command::Validate { source, target } => validate(ctx, &source, &target),
        Command::Commit { source, target } => commit(ctx, &source, &target),
    }
}

/// Open the datastore the context points at.
pub(crate) fn open_datastore(ctx: &Context) -> Result<Datastore> {
    Datastore::from_config(&ctx.config).context("Failed to open datastore")
}
