//! delete command - Remove a store's backing file

use anyhow::{Context as _, Result};

use super::open_datastore;
use crate::cli::Context;
use crate::core::types::StoreName;
use crate::ui::output;

pub fn delete(ctx: &Context, store: &StoreName) -> Result<()> {
    let ds = open_datastore(ctx)?;
    ds.delete(store)
        .with_context(|| format!("Failed to delete store '{}'", store))?;
    output::success(format!("Deleted store '{}'", store), ctx.verbosity);
    Ok(())
}
