//! init command - Create an empty store

use anyhow::{Context as _, Result};

use super::open_datastore;
use crate::cli::Context;
use crate::core::types::StoreName;
use crate::ui::output;

/// Create `store` unless it already exists.
pub fn init(ctx: &Context, store: &StoreName) -> Result<()> {
    let ds = open_datastore(ctx)?;
    if ds.exists(store)? {
        output::success(format!("Store '{}' already exists.", store), ctx.verbosity);
        return Ok(());
    }
    ds.create(store)
        .with_context(|| format!("Failed to create store '{}'", store))?;
    output::success(
        format!("Created store '{}' in {}", store, ds.paths().dbdir().display()),
        ctx.verbosity,
    );
    Ok(())
}
