//! datastore::modify
//!
//! Schema-guided reconciliation of an edit tree into a base tree.
//!
//! # Architecture
//!
//! One edit pass runs through a [`Modifier`]:
//! 1. Resolve the target (optionally via an api-path, see
//!    [`super::api_path`])
//! 2. [`Modifier::modify`] walks the edit tree and the base tree together,
//!    applying the effective operation of every edit node
//! 3. [`Modifier::finish`] prunes every subtree that stayed speculative and
//!    drops the pass flags
//!
//! The effective operation of an edit node is its `operation` attribute if
//! present, else the operation inherited from its parent.
//!
//! Interior nodes created to reach deeper content are speculative: they
//! survive the pass only if real content ends up beneath them. Leaves
//! created under `none` are speculative too.
//!
//! # Identity
//!
//! An edit child matches a base sibling when:
//! - list: same name and equal values for every key leaf
//! - leaf-list: same name and equal body
//! - otherwise: same name, first match wins
//!
//! # Example
//!
//! ```
//! use xmldb::core::schema::{Schema, SchemaDef};
//! use xmldb::core::tree::Tree;
//! use xmldb::core::types::EditOp;
//! use xmldb::core::xml;
//! use xmldb::datastore::modify::apply;
//!
//! let schema = Schema::from_defs(vec![
//!     SchemaDef::container("system").child(SchemaDef::leaf("hostname")),
//! ])
//! .unwrap();
//!
//! let mut base = Tree::new("config");
//! let edit = xml::parse_edit("<system><hostname>r1</hostname></system>").unwrap();
//! apply(&mut base, &schema, EditOp::Merge, None, Some(&edit)).unwrap();
//!
//! let system = base.find(base.root(), "system").unwrap();
//! assert_eq!(base.find_body(system, "hostname"), Some("r1"));
//! ```

use tracing::{debug, trace};

use super::api_path::{self, Resolution};
use super::error::DatastoreError;
use crate::core::schema::{Keyword, SchemaId, SchemaProvider};
use crate::core::tree::{FlagSet, NodeId, NodeKind, Tree};
use crate::core::types::EditOp;

/// Per-pass node bookkeeping.
#[derive(Debug, Default)]
pub struct PassFlags {
    speculative: FlagSet,
    created: FlagSet,
}

impl PassFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node created during this pass.
    pub fn record_created(&mut self, id: NodeId, speculative: bool) {
        self.created.insert(id);
        if speculative {
            self.speculative.insert(id);
        }
    }

    /// Mark a node as holding real content.
    pub fn make_real(&mut self, id: NodeId) {
        self.speculative.remove(id);
    }

    pub fn is_speculative(&self, id: NodeId) -> bool {
        self.speculative.contains(id)
    }

    /// Check if a node was created during this pass.
    pub fn is_new(&self, id: NodeId) -> bool {
        self.created.contains(id)
    }

    pub fn speculative(&self) -> &FlagSet {
        &self.speculative
    }
}

/// Value of the `operation` attribute of an edit node.
///
/// Prefixed forms such as `nc:operation` are accepted.
pub fn operation_attribute(edit: &Tree, node: NodeId) -> Option<&str> {
    edit.attributes(node)
        .find(|(key, _)| {
            !key.starts_with("xmlns") && key.rsplit(':').next() == Some("operation")
        })
        .map(|(_, value)| value)
}

/// Find the sibling under `parent` in `base` identical to `node` of `other`.
pub fn find_identical(
    schema: &dyn SchemaProvider,
    base: &Tree,
    parent: NodeId,
    other: &Tree,
    node: NodeId,
    y: Option<SchemaId>,
) -> Option<NodeId> {
    let name = other.name(node);
    let mut same_name = base.elements(parent).filter(|c| base.name(*c) == name);
    match y.map(|y| (y, schema.keyword(y))) {
        Some((_, Keyword::LeafList)) => {
            let body = other.body(node);
            same_name.find(|c| base.body(*c) == body)
        }
        Some((y, Keyword::List)) => {
            let keys = schema.keys(y);
            same_name.find(|c| {
                keys.iter()
                    .all(|k| match (base.find_body(*c, k), other.find_body(node, k)) {
                        (Some(a), Some(b)) => a == b,
                        _ => false,
                    })
            })
        }
        _ => same_name.next(),
    }
}

fn child_path(tree: &Tree, parent: NodeId, name: &str) -> String {
    let base = tree.path_of(parent);
    if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Applies edit trees to a base tree within one pass.
pub struct Modifier<'s> {
    schema: &'s dyn SchemaProvider,
    flags: PassFlags,
}

impl<'s> Modifier<'s> {
    pub fn new(schema: &'s dyn SchemaProvider) -> Self {
        Self {
            schema,
            flags: PassFlags::new(),
        }
    }

    pub fn flags(&self) -> &PassFlags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut PassFlags {
        &mut self.flags
    }

    /// Reconcile `edit` into `tree`.
    ///
    /// `x0` is the base node matching the edit node (absent if it does not
    /// exist yet), `x0_parent` the base node it lives or will live under,
    /// and `y` its schema node (`None` for the root).
    ///
    /// # Errors
    ///
    /// Fails fast on the first conflict; the tree is then partially
    /// modified and must be discarded.
    pub fn modify(
        &mut self,
        tree: &mut Tree,
        x0: Option<NodeId>,
        x0_parent: NodeId,
        edit: Option<(&Tree, NodeId)>,
        op: EditOp,
        y: Option<SchemaId>,
    ) -> Result<(), DatastoreError> {
        let Some((edit, x1)) = edit else {
            if op == EditOp::Replace {
                if let Some(x0) = x0 {
                    Self::purge(tree, x0);
                }
            }
            return Ok(());
        };

        let op = match operation_attribute(edit, x1) {
            Some(value) => value.parse::<EditOp>()?,
            None => op,
        };
        trace!(node = edit.name(x1), op = %op, "modify");

        match y.map(|y| self.schema.keyword(y)) {
            Some(keyword) if keyword.is_terminal() => {
                self.modify_terminal(tree, x0, x0_parent, edit, x1, op, y)
            }
            _ => self.modify_interior(tree, x0, x0_parent, edit, x1, op, y),
        }
    }

    fn node_name(&self, edit: &Tree, x1: NodeId, y: Option<SchemaId>) -> String {
        match y {
            Some(y) => self.schema.name(y).to_string(),
            None => edit.name(x1).to_string(),
        }
    }

    fn create_node(
        &mut self,
        tree: &mut Tree,
        parent: NodeId,
        name: &str,
        y: Option<SchemaId>,
        speculative: bool,
    ) -> NodeId {
        let id = tree.add_element(parent, name);
        tree.set_schema(id, y);
        self.flags.record_created(id, speculative);
        id
    }

    fn purge(tree: &mut Tree, node: NodeId) {
        if node == tree.root() {
            tree.clear(node);
        } else {
            tree.remove(node);
        }
    }

    /// Empty a list entry except for the key leaves that identify it.
    fn purge_entry(&self, tree: &mut Tree, node: NodeId, y: SchemaId) {
        let keys = self.schema.keys(y);
        let doomed: Vec<NodeId> = tree
            .children(node)
            .iter()
            .copied()
            .filter(|c| match tree.kind(*c) {
                NodeKind::Attribute => false,
                NodeKind::Body => true,
                NodeKind::Element => !keys.iter().any(|k| k == tree.name(*c)),
            })
            .collect();
        for c in doomed {
            tree.remove(c);
        }
    }

    /// `create` through a path without an edit tree: the path alone names
    /// the node, and a leaf-list entry takes its value from the path.
    fn create_named(
        &mut self,
        tree: &mut Tree,
        target: Option<NodeId>,
        parent: NodeId,
        y: Option<SchemaId>,
        value: Option<&str>,
    ) -> Result<(), DatastoreError> {
        match (target, y) {
            (Some(node), _) if node == tree.root() || !self.flags.is_new(node) => {
                Err(DatastoreError::AlreadyExists(tree.path_of(node)))
            }
            (None, Some(y)) => {
                let name = self.schema.name(y).to_string();
                let node = self.create_node(tree, parent, &name, Some(y), false);
                if self.schema.keyword(y) == Keyword::LeafList {
                    tree.set_body(node, value.unwrap_or(""));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn modify_terminal(
        &mut self,
        tree: &mut Tree,
        x0: Option<NodeId>,
        x0_parent: NodeId,
        edit: &Tree,
        x1: NodeId,
        op: EditOp,
        y: Option<SchemaId>,
    ) -> Result<(), DatastoreError> {
        let name = self.node_name(edit, x1, y);
        match op {
            EditOp::Create | EditOp::Merge | EditOp::Replace | EditOp::None => {
                if op == EditOp::Create {
                    if let Some(existing) = x0.filter(|n| !self.flags.is_new(*n)) {
                        return Err(DatastoreError::AlreadyExists(tree.path_of(existing)));
                    }
                }
                let node = match x0 {
                    Some(node) => node,
                    None => self.create_node(tree, x0_parent, &name, y, op == EditOp::None),
                };
                if op != EditOp::None {
                    self.flags.make_real(node);
                }
                if let Some(body) = edit.body(x1) {
                    tree.set_body(node, body);
                }
            }
            EditOp::Delete => match x0 {
                Some(node) => Self::purge(tree, node),
                None => {
                    return Err(DatastoreError::DoesNotExist(child_path(
                        tree, x0_parent, &name,
                    )))
                }
            },
            EditOp::Remove => {
                if let Some(node) = x0 {
                    Self::purge(tree, node);
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn modify_interior(
        &mut self,
        tree: &mut Tree,
        x0: Option<NodeId>,
        x0_parent: NodeId,
        edit: &Tree,
        x1: NodeId,
        op: EditOp,
        y: Option<SchemaId>,
    ) -> Result<(), DatastoreError> {
        let is_root = x0 == Some(tree.root());
        let name = self.node_name(edit, x1, y);
        match op {
            EditOp::Create => {
                let exists = if is_root {
                    !edit.has_elements(x1)
                } else {
                    x0.is_some_and(|n| !self.flags.is_new(n))
                };
                if exists {
                    let path = match x0 {
                        Some(n) => tree.path_of(n),
                        None => child_path(tree, x0_parent, &name),
                    };
                    return Err(DatastoreError::AlreadyExists(path));
                }
                self.merge_children(tree, x0, x0_parent, &name, edit, x1, op, y)
            }
            EditOp::Replace => {
                let exists = if is_root {
                    !edit.has_elements(x1)
                } else {
                    x0.is_some()
                };
                let mut x0 = x0;
                if exists {
                    if let Some(node) = x0 {
                        match y {
                            Some(y) if self.schema.keyword(y) == Keyword::List => {
                                self.purge_entry(tree, node, y)
                            }
                            _ => {
                                Self::purge(tree, node);
                                if !is_root {
                                    x0 = None;
                                }
                            }
                        }
                    }
                }
                self.merge_children(tree, x0, x0_parent, &name, edit, x1, op, y)
            }
            EditOp::Merge | EditOp::None => {
                self.merge_children(tree, x0, x0_parent, &name, edit, x1, op, y)
            }
            EditOp::Delete => match x0 {
                Some(node) => {
                    Self::purge(tree, node);
                    Ok(())
                }
                None => Err(DatastoreError::DoesNotExist(child_path(
                    tree, x0_parent, &name,
                ))),
            },
            EditOp::Remove => {
                if let Some(node) = x0 {
                    Self::purge(tree, node);
                }
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn merge_children(
        &mut self,
        tree: &mut Tree,
        x0: Option<NodeId>,
        x0_parent: NodeId,
        name: &str,
        edit: &Tree,
        x1: NodeId,
        op: EditOp,
        y: Option<SchemaId>,
    ) -> Result<(), DatastoreError> {
        let node = match x0 {
            Some(node) => node,
            None => self.create_node(tree, x0_parent, name, y, true),
        };

        let children: Vec<NodeId> = edit.elements(x1).collect();
        for x1c in children {
            let cname = edit.name(x1c);
            let yc = self.schema.resolve(y, cname).ok_or_else(|| {
                DatastoreError::Schema(format!(
                    "no schema node found: {}",
                    child_path(tree, node, cname)
                ))
            })?;
            if self.schema.keyword(yc) == Keyword::List {
                for key in self.schema.keys(yc) {
                    if edit.find(x1c, key).is_none() {
                        return Err(DatastoreError::Validation(format!(
                            "list entry '{}' is missing key '{}'",
                            child_path(tree, node, cname),
                            key
                        )));
                    }
                }
            }
            let x0c = find_identical(self.schema, tree, node, edit, x1c, Some(yc));
            self.modify(tree, x0c, node, Some((edit, x1c)), op, Some(yc))?;
        }
        Ok(())
    }

    /// Prune every subtree that stayed speculative and end the pass.
    pub fn finish(self, tree: &mut Tree) {
        tree.prune_flagged(&self.flags.speculative);
    }
}

/// Apply one edit to `tree`: resolve `path`, reconcile `edit`, prune.
///
/// With `delete` or `remove` the resolved target is removed outright (the
/// root is emptied instead). Without a path the edit root stands for the
/// tree root; with a path it stands for the resolved target. `create` with
/// a path and no edit creates the node the path names.
///
/// # Errors
///
/// Any resolver or modify failure. The tree must then be discarded.
pub fn apply(
    tree: &mut Tree,
    schema: &dyn SchemaProvider,
    op: EditOp,
    path: Option<&str>,
    edit: Option<&Tree>,
) -> Result<(), DatastoreError> {
    debug!(op = %op, path = path.unwrap_or("/"), "applying edit");
    let mut modifier = Modifier::new(schema);
    let root = tree.root();

    let (target, parent, y) = match path {
        Some(path) => match api_path::resolve(tree, schema, path, op, modifier.flags_mut())? {
            Resolution::NothingToDo => {
                debug!(path, "nothing to remove");
                modifier.finish(tree);
                return Ok(());
            }
            Resolution::Found(resolved) => (resolved.target, resolved.parent, resolved.schema),
        },
        None => (Some(root), root, None),
    };

    if op.is_removal() {
        match target {
            Some(t) if t == root => tree.clear(root),
            Some(t) => tree.remove(t),
            None => {}
        }
    } else if let (EditOp::Create, Some(path), None) = (op, path, edit) {
        let value = api_path::final_value(path);
        modifier.create_named(tree, target, parent, y, value)?;
    } else {
        modifier.modify(tree, target, parent, edit.map(|e| (e, e.root())), op, y)?;
    }
    modifier.finish(tree);
    Ok(())
}
