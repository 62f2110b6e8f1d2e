//! core::tree
//!
//! Arena-owned configuration trees.
//!
//! # Architecture
//!
//! A [`Tree`] owns every node it contains in a single arena; nodes are
//! addressed by [`NodeId`]. Removing a node detaches it (and its subtree)
//! from its parent. Detached nodes stay in the arena until the tree value is
//! dropped, so a `NodeId` never dangles while its tree is alive.
//!
//! Node kinds follow the XML shape of the stores:
//! - [`NodeKind::Element`] - named element with ordered children
//! - [`NodeKind::Body`] - text content of an element
//! - [`NodeKind::Attribute`] - `name="value"` pair on an element
//!
//! # Flags
//!
//! Multi-pass algorithms (query marking, speculative creation, diffing) do
//! not store flags on nodes. Each pass owns a [`FlagSet`] keyed by
//! `NodeId` and drops it when the pass ends.
//!
//! # Example
//!
//! ```
//! use xmldb::core::tree::Tree;
//!
//! let mut tree = Tree::new("config");
//! let root = tree.root();
//! let ifs = tree.add_element(root, "interfaces");
//! let entry = tree.add_element(ifs, "interface");
//! let name = tree.add_element(entry, "name");
//! tree.set_body(name, "eth0");
//!
//! assert_eq!(tree.find_body(entry, "name"), Some("eth0"));
//! assert_eq!(tree.path_of(name), "/interfaces/interface/name");
//! ```

use std::collections::HashSet;

use crate::core::schema::SchemaId;

/// Handle to a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of the node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Body,
    Attribute,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: NodeKind,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    schema: Option<SchemaId>,
}

impl Node {
    fn new(name: &str, kind: NodeKind, value: Option<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value,
            parent,
            children: Vec::new(),
            schema: None,
        }
    }
}

/// An XML-shaped tree with arena-owned nodes.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Pass-local set of flagged nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet(HashSet<NodeId>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a node. Returns false if it was already flagged.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<NodeId> for FlagSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<NodeId> for FlagSet {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl Tree {
    /// Create a tree holding a single root element.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node::new(root_name, NodeKind::Element, None, None)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Make `id` the root of the tree, detaching it from its parent.
    ///
    /// Everything outside the new root's subtree becomes unreachable.
    pub fn set_root(&mut self, id: NodeId) {
        self.detach(id);
        self.root = id;
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn set_name(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].name = name.to_string();
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Raw value of a body or attribute node.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].value.as_deref()
    }

    /// All children of a node, every kind, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children of a node in document order.
    pub fn elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children_of_kind(id, NodeKind::Element)
    }

    /// Attribute children of a node as `(name, value)` pairs.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.children_of_kind(id, NodeKind::Attribute).map(move |a| {
            let node = &self.nodes[a.0];
            (node.name.as_str(), node.value.as_deref().unwrap_or(""))
        })
    }

    fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |c| self.nodes[c.0].kind == kind)
    }

    pub fn element_count(&self, id: NodeId) -> usize {
        self.elements(id).count()
    }

    pub fn has_elements(&self, id: NodeId) -> bool {
        self.elements(id).next().is_some()
    }

    fn push(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append a new element child.
    pub fn add_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push(parent, Node::new(name, NodeKind::Element, None, Some(parent)))
    }

    /// Append a new body child.
    pub fn add_body(&mut self, parent: NodeId, value: &str) -> NodeId {
        self.push(
            parent,
            Node::new("body", NodeKind::Body, Some(value.to_string()), Some(parent)),
        )
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(attr) = self.find_attribute(id, name) {
            self.nodes[attr.0].value = Some(value.to_string());
        } else {
            self.push(
                id,
                Node::new(name, NodeKind::Attribute, Some(value.to_string()), Some(id)),
            );
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.find_attribute(id, name).and_then(|a| self.value(a))
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attr = self.find_attribute(id, name)?;
        self.detach(attr);
        self.nodes[attr.0].value.clone()
    }

    fn find_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_of_kind(id, NodeKind::Attribute)
            .find(|a| self.nodes[a.0].name == name)
    }

    /// Body text of an element, if it has a body child.
    pub fn body(&self, id: NodeId) -> Option<&str> {
        self.children_of_kind(id, NodeKind::Body)
            .next()
            .and_then(|b| self.value(b))
    }

    /// Set the body text of an element, creating the body node if needed.
    pub fn set_body(&mut self, id: NodeId, value: &str) {
        let existing = self.children_of_kind(id, NodeKind::Body).next();
        match existing {
            Some(b) => self.nodes[b.0].value = Some(value.to_string()),
            None => {
                self.add_body(id, value);
            }
        }
    }

    /// First element child with the given name.
    pub fn find(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.elements(id).find(|c| self.nodes[c.0].name == name)
    }

    /// Body of the first element child with the given name.
    pub fn find_body(&self, id: NodeId, name: &str) -> Option<&str> {
        self.find(id, name).and_then(|c| self.body(c))
    }

    pub fn schema(&self, id: NodeId) -> Option<SchemaId> {
        self.nodes[id.0].schema
    }

    pub fn set_schema(&mut self, id: NodeId, schema: Option<SchemaId>) {
        self.nodes[id.0].schema = schema;
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Remove a node and its subtree from the tree.
    ///
    /// The root cannot be removed; use [`Tree::clear`] to empty it.
    pub fn remove(&mut self, id: NodeId) {
        if id != self.root {
            self.detach(id);
        }
    }

    /// Remove all element and body children, keeping attributes.
    pub fn clear(&mut self, id: NodeId) {
        let doomed: Vec<NodeId> = self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.nodes[c.0].kind != NodeKind::Attribute)
            .collect();
        for c in doomed {
            self.detach(c);
        }
    }

    /// Check if a node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.nodes[cur.0].parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Reorder the children of a node.
    ///
    /// `order` must be a permutation of the node's current children.
    pub fn reorder_children(&mut self, id: NodeId, order: Vec<NodeId>) {
        debug_assert_eq!(order.len(), self.nodes[id.0].children.len());
        self.nodes[id.0].children = order;
    }

    /// Elements of the subtree rooted at `id` (inclusive) in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            let children: Vec<NodeId> = self.elements(cur).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Slash-separated element path from the root (root excluded).
    pub fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            if n == self.root {
                break;
            }
            parts.push(self.nodes[n.0].name.as_str());
            cur = self.nodes[n.0].parent;
        }
        if parts.is_empty() {
            return "/".to_string();
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Deep-copy `src_node` of `src` as a new last child of `parent`.
    pub fn copy_subtree(&mut self, parent: NodeId, src: &Tree, src_node: NodeId) -> NodeId {
        let node = &src.nodes[src_node.0];
        let mut copy = Node::new(&node.name, node.kind, node.value.clone(), Some(parent));
        copy.schema = node.schema;
        let id = self.push(parent, copy);
        for c in src.children(src_node).to_vec() {
            self.copy_subtree(id, src, c);
        }
        id
    }

    /// Structural equality of two subtrees.
    ///
    /// Names, kinds, values and content order must match. Attributes are
    /// compared in their own order, independent of where they sit among
    /// the content children. Schema links are ignored.
    pub fn subtree_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        let na = &self.nodes[a.0];
        let nb = &other.nodes[b.0];
        if na.name != nb.name || na.kind != nb.kind || na.value != nb.value {
            return false;
        }
        if !self.attributes(a).eq(other.attributes(b)) {
            return false;
        }
        let content = |t: &Tree, id: NodeId| -> Vec<NodeId> {
            t.nodes[id.0]
                .children
                .iter()
                .copied()
                .filter(|c| t.nodes[c.0].kind != NodeKind::Attribute)
                .collect()
        };
        let ca = content(self, a);
        let cb = content(other, b);
        ca.len() == cb.len()
            && ca
                .iter()
                .zip(cb.iter())
                .all(|(x, y)| self.subtree_eq(*x, other, *y))
    }

    /// Keep only flagged nodes, their subtrees and their ancestors.
    ///
    /// The root is always retained. Returns true if anything under the root
    /// was flagged.
    pub fn retain_flagged(&mut self, flags: &FlagSet) -> bool {
        let root = self.root;
        if flags.contains(root) {
            return true;
        }
        self.retain_flagged_sub(root, flags)
    }

    fn retain_flagged_sub(&mut self, id: NodeId, flags: &FlagSet) -> bool {
        let mut keep = false;
        let children: Vec<NodeId> = self.elements(id).collect();
        for c in children {
            if flags.contains(c) || self.retain_flagged_sub(c, flags) {
                keep = true;
            } else {
                self.detach(c);
            }
        }
        keep
    }

    /// Remove every subtree whose elements are all flagged.
    ///
    /// Works bottom-up; the root itself is never removed.
    pub fn prune_flagged(&mut self, flags: &FlagSet) {
        let root = self.root;
        self.prune_flagged_sub(root, flags);
    }

    fn prune_flagged_sub(&mut self, id: NodeId, flags: &FlagSet) -> bool {
        let children: Vec<NodeId> = self.elements(id).collect();
        for c in children {
            if self.prune_flagged_sub(c, flags) {
                self.detach(c);
            }
        }
        flags.contains(id) && !self.has_elements(id)
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}
