//! engine::plugin
//!
//! Transaction participants.
//!
//! A [`Plugin`] observes every validate/commit transaction through one
//! callback per phase. All callbacks except [`Plugin::name`] default to
//! success, so a plugin implements only the phases it cares about.
//!
//! Plugins are called in registration order; revert runs in reverse
//! order. See [`crate::engine::coordinator`] for the phase protocol.

use thiserror::Error;

use crate::core::query::NamespaceContext;
use crate::core::tree::Tree;
use crate::core::types::StoreName;

use super::transaction::Transaction;

/// Failure reported by a plugin callback.
///
/// A plugin should always say what went wrong. A failure with no message
/// is still honored, but the coordinator logs it as a contract violation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", .message.as_deref().unwrap_or("plugin failed without a message"))]
pub struct PluginError {
    message: Option<String>,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: (!message.is_empty()).then_some(message),
        }
    }

    /// A failure that carries no description.
    pub fn silent() -> Self {
        Self { message: None }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_silent(&self) -> bool {
        self.message.is_none()
    }
}

/// A transaction participant.
///
/// # Phase Contract
///
/// - `begin`, `validate`, `complete`: a failure stops the phase and aborts
///   the transaction
/// - `commit`: a failure reverts every plugin that already committed
/// - `revert`: undo a successful `commit`; failures are logged only
/// - `end`: called after a successful commit
/// - `abort`: called after any failure before or during commit; its
///   result is ignored
pub trait Plugin {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    fn begin(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    fn validate(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    fn complete(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    fn commit(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    fn revert(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    fn end(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    fn abort(&mut self, _tx: &Transaction) -> Result<(), PluginError> {
        Ok(())
    }

    /// Add operational state below `tree`, a fresh `config` root.
    ///
    /// `query` is the caller's query, if any, with `ns` binding its
    /// prefixes. A plugin may use it to skip work but is free to return
    /// more than asked for.
    fn statedata(
        &mut self,
        _ns: &NamespaceContext,
        _query: Option<&str>,
        _tree: &mut Tree,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Bring system state back in line with `store`.
    fn reset(&mut self, _store: &StoreName) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Plugins in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin; it runs after every plugin registered before it.
    pub fn register(&mut self, plugin: impl Plugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
        self.register(plugin);
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Plugin + 'static)> {
        self.plugins.get_mut(index).map(|p| p.as_mut())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Plugin + 'static)> {
        self.plugins.iter_mut().map(|p| p.as_mut())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    mod plugin_error {
        use super::*;

        #[test]
        fn message_is_display() {
            let err = PluginError::new("interface eth9 is unknown");
            assert_eq!(err.to_string(), "interface eth9 is unknown");
            assert!(!err.is_silent());
        }

        #[test]
        fn empty_message_is_silent() {
            assert!(PluginError::new("").is_silent());
            assert!(PluginError::silent().is_silent());
            assert_eq!(
                PluginError::silent().to_string(),
                "plugin failed without a message"
            );
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn keeps_registration_order() {
            let registry = PluginRegistry::new()
                .with(Named("a"))
                .with(Named("b"))
                .with(Named("c"));
            assert_eq!(registry.names(), vec!["a", "b", "c"]);
            assert_eq!(registry.len(), 3);
        }

        #[test]
        fn default_callbacks_pass() {
            let mut plugin = Named("a");
            let store = StoreName::running();
            assert!(plugin.reset(&store).is_ok());
            let mut tree = Tree::new("config");
            assert!(plugin
                .statedata(&NamespaceContext::new(), None, &mut tree)
                .is_ok());
        }

        #[test]
        fn debug_lists_names() {
            let registry = PluginRegistry::new().with(Named("log"));
            assert!(format!("{:?}", registry).contains("log"));
        }
    }
}
