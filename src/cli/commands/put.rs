//! put command - Apply an XML edit to a store
//!
//! The edit is read from `--file` or stdin. The edit is optional for
//! `delete` and `remove`, and whenever `--path` is given (the path alone
//! creates missing nodes); any text given is still parsed so mistakes are
//! reported.

use std::io::{self, IsTerminal, Read};
use std::path::Path;

use anyhow::{bail, Context as _, Result};

use super::open_datastore;
use crate::cli::Context;
use crate::core::tree::Tree;
use crate::core::types::{EditOp, StoreName};
use crate::core::xml;
use crate::ui::output;

/// Apply an edit to `store`.
pub fn put(
    ctx: &Context,
    store: &StoreName,
    op: EditOp,
    path: Option<&str>,
    file: Option<&Path>,
) -> Result<()> {
    let ds = open_datastore(ctx)?;
    let edit = read_edit(op.is_removal() || path.is_some(), op, file)?;

    ds.put(store, op, path, edit.as_ref())
        .with_context(|| format!("Failed to apply {} to store '{}'", op, store))?;
    output::success(
        format!("Applied {} to '{}' at {}", op, store, path.unwrap_or("/")),
        ctx.verbosity,
    );
    Ok(())
}

fn read_edit(optional: bool, op: EditOp, file: Option<&Path>) -> Result<Option<Tree>> {
    let text = match file {
        Some(file) => std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read edit file {}", file.display()))?,
        None if optional && io::stdin().is_terminal() => return Ok(None),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read edit from stdin")?;
            text
        }
    };

    if text.trim().is_empty() {
        if optional {
            return Ok(None);
        }
        bail!("No edit given for operation '{}'", op);
    }
    let tree = xml::parse_edit(&text).context("Failed to parse edit")?;
    Ok(Some(tree))
}
