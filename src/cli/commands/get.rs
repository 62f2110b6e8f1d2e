//! get command - Print a store, optionally filtered by a query
//!
//! # Example
//!
//! ```bash
//! xmldb get running
//! xmldb get running --query /system/hostname --json
//! ```

use anyhow::{Context as _, Result};

use super::open_datastore;
use crate::cli::Context;
use crate::core::types::StoreName;
use crate::core::xml;
use crate::ui::output;

/// Print `store` as XML or JSON.
pub fn get(ctx: &Context, store: &StoreName, query: Option<&str>, json: bool) -> Result<()> {
    let ds = open_datastore(ctx)?;
    let result = ds
        .get(store, query)
        .with_context(|| format!("Failed to read store '{}'", store))?;
    output::debug(
        format!("{} node(s) matched", result.matches.len()),
        ctx.verbosity,
    );

    if json {
        output::json(&xml::to_json(&result.tree, result.tree.root()));
    } else {
        output::result(xml::to_string(&result.tree));
    }
    Ok(())
}
