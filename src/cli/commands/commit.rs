//! validate and commit commands
//!
//! Both run a transaction over the whole of the source and target stores.
//! The only plugin registered from the command line is the transaction
//! log, whose events show with `--debug`.

use anyhow::{Context as _, Result};

use super::open_datastore;
use crate::cli::Context;
use crate::core::types::StoreName;
use crate::engine::commit::{candidate_commit, candidate_validate};
use crate::engine::coordinator::Coordinator;
use crate::engine::plugin::PluginRegistry;
use crate::engine::plugins::TransactionLogPlugin;
use crate::ui::output::{self, Verbosity};

fn registry(verbosity: Verbosity) -> PluginRegistry {
    let plugin = if verbosity == Verbosity::Debug {
        TransactionLogPlugin::verbose()
    } else {
        TransactionLogPlugin::new()
    };
    PluginRegistry::new().with(plugin)
}

/// Validate `target` against `source`.
pub fn validate(ctx: &Context, source: &StoreName, target: &StoreName) -> Result<()> {
    let ds = open_datastore(ctx)?;
    let mut registry = registry(ctx.verbosity);
    candidate_validate(&ds, &mut Coordinator::new(), &mut registry, source, target)
        .with_context(|| format!("Validation of '{}' failed", target))?;
    output::success(format!("'{}' is valid", target), ctx.verbosity);
    Ok(())
}

/// Commit `target` into `source`.
pub fn commit(ctx: &Context, source: &StoreName, target: &StoreName) -> Result<()> {
    let ds = open_datastore(ctx)?;
    let mut registry = registry(ctx.verbosity);
    candidate_commit(&ds, &mut Coordinator::new(), &mut registry, source, target)
        .with_context(|| format!("Commit of '{}' into '{}' failed", target, source))?;
    output::success(format!("Committed '{}' into '{}'", target, source), ctx.verbosity);
    Ok(())
}
