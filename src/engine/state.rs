//! engine::state
//!
//! Operational state from plugins, and plugin reset.
//!
//! Each plugin writes its state into a fresh `config` tree. The tree is
//! checked against the schema and merged into the accumulated result. The
//! first plugin that fails, or returns a tree the schema does not accept,
//! ends the pass; whatever was merged before it is kept.

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::query::NamespaceContext;
use crate::core::schema::SchemaProvider;
use crate::core::tree::Tree;
use crate::core::types::{EditOp, StoreName};
use crate::core::xml::CONFIG;
use crate::datastore::{get, modify};

use super::plugin::{PluginError, PluginRegistry};

const INVALID_STATE: &str = "Internal error: state callback returned invalid XML";

/// Merged state data and the reason collection stopped early, if it did.
#[derive(Debug, Clone)]
pub struct StateData {
    pub tree: Tree,
    pub failure: Option<String>,
}

impl StateData {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// A plugin failed to reset.
#[derive(Debug, Error)]
#[error("reset of '{store}' failed in plugin '{plugin}': {source}")]
pub struct ResetError {
    pub store: StoreName,
    pub plugin: String,
    #[source]
    pub source: PluginError,
}

/// Collect state from every plugin in registration order.
pub fn collect_state(
    registry: &mut PluginRegistry,
    schema: &dyn SchemaProvider,
    ns: &NamespaceContext,
    query: Option<&str>,
) -> StateData {
    let mut merged = Tree::new(CONFIG);

    for plugin in registry.iter_mut() {
        let mut state = Tree::new(CONFIG);
        if let Err(err) = plugin.statedata(ns, query, &mut state) {
            warn!(plugin = plugin.name(), error = %err, "state callback failed");
            return StateData {
                tree: merged,
                failure: Some(err.to_string()),
            };
        }

        let checked = get::populate(&mut state, schema)
            .and_then(|_| get::sanity(&state, schema))
            .and_then(|_| modify::apply(&mut merged, schema, EditOp::Merge, None, Some(&state)));
        if let Err(err) = checked {
            warn!(plugin = plugin.name(), error = %err, "invalid state data");
            return StateData {
                tree: merged,
                failure: Some(format!("{}: {}", INVALID_STATE, err)),
            };
        }
        debug!(plugin = plugin.name(), "state merged");
    }

    StateData {
        tree: merged,
        failure: None,
    }
}

/// Ask every plugin to bring system state in line with `store`.
///
/// Stops at the first failure.
pub fn reset_plugins(registry: &mut PluginRegistry, store: &StoreName) -> Result<(), ResetError> {
    for plugin in registry.iter_mut() {
        plugin.reset(store).map_err(|source| ResetError {
            store: store.clone(),
            plugin: plugin.name().to_string(),
            source,
        })?;
        debug!(plugin = plugin.name(), store = %store, "reset");
    }
    Ok(())
}
