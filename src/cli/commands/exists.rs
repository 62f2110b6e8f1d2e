//! exists command - Print whether a store exists

use anyhow::Result;

use super::open_datastore;
use crate::cli::Context;
use crate::core::types::StoreName;
use crate::ui::output;

pub fn exists(ctx: &Context, store: &StoreName) -> Result<()> {
    let ds = open_datastore(ctx)?;
    output::result(format!("{}\n", ds.exists(store)?));
    Ok(())
}
