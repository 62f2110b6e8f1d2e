//! copy command - Copy one store over another

use anyhow::{Context as _, Result};

use super::open_datastore;
use crate::cli::Context;
use crate::core::types::StoreName;
use crate::ui::output;

pub fn copy(ctx: &Context, from: &StoreName, to: &StoreName) -> Result<()> {
    let ds = open_datastore(ctx)?;
    ds.copy(from, to)
        .with_context(|| format!("Failed to copy '{}' to '{}'", from, to))?;
    output::success(format!("Copied '{}' to '{}'", from, to), ctx.verbosity);
    Ok(())
}
