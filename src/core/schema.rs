//! core::schema
//!
//! Schema provider interface and the TOML-defined schema.
//!
//! # Architecture
//!
//! Every schema-aware algorithm in the crate talks to a schema through the
//! [`SchemaProvider`] trait. Schema nodes are addressed by [`SchemaId`]
//! handles issued by the provider; the tree stores these handles as its
//! schema links.
//!
//! [`Schema`] is the bundled provider. It is built from [`SchemaDef`]
//! values, either in code with the builder constructors or from a TOML
//! file:
//!
//! ```toml
//! [[node]]
//! name = "interfaces"
//! keyword = "container"
//!
//! [[node.children]]
//! name = "interface"
//! keyword = "list"
//! keys = ["name"]
//!
//! [[node.children.children]]
//! name = "name"
//! keyword = "leaf"
//! ```
//!
//! # Example
//!
//! ```
//! use xmldb::core::schema::{Keyword, Schema, SchemaDef, SchemaProvider};
//!
//! let schema = Schema::from_defs(vec![SchemaDef::container("interfaces").child(
//!     SchemaDef::list("interface", &["name"])
//!         .child(SchemaDef::leaf("name"))
//!         .child(SchemaDef::leaf("mtu").with_default("1500")),
//! )])
//! .unwrap();
//!
//! let ifs = schema.top("interfaces").unwrap();
//! let entry = schema.child(ifs, "interface").unwrap();
//! assert_eq!(schema.keyword(entry), Keyword::List);
//! assert_eq!(schema.keys(entry), ["name".to_string()]);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse schema file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// Handle to a node of a [`SchemaProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Statement keyword of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Keyword {
    Container,
    List,
    Leaf,
    LeafList,
}

impl Keyword {
    /// Leaf and leaf-list nodes carry a body and no element children.
    pub fn is_terminal(self) -> bool {
        matches!(self, Keyword::Leaf | Keyword::LeafList)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Container => "container",
            Keyword::List => "list",
            Keyword::Leaf => "leaf",
            Keyword::LeafList => "leaf-list",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to a data-model schema.
///
/// Implementations must return stable ids: the same node always yields the
/// same [`SchemaId`] for the lifetime of the provider.
pub trait SchemaProvider {
    /// Module top-level node with the given name.
    fn top(&self, name: &str) -> Option<SchemaId>;

    /// Child of `parent` with the given name.
    fn child(&self, parent: SchemaId, name: &str) -> Option<SchemaId>;

    /// Module top-level nodes in declaration order.
    fn tops(&self) -> &[SchemaId];

    fn keyword(&self, id: SchemaId) -> Keyword;

    /// Key-leaf names of a list, in key order. Empty for other keywords.
    fn keys(&self, id: SchemaId) -> &[String];

    fn name(&self, id: SchemaId) -> &str;

    /// Default value of a leaf, if any.
    fn default_value(&self, id: SchemaId) -> Option<&str>;

    /// Children in declaration order.
    fn children(&self, id: SchemaId) -> &[SchemaId];

    /// False for state (non-configuration) data.
    fn is_config(&self, _id: SchemaId) -> bool {
        true
    }

    /// Resolve `name` under `parent`, or among the top nodes when `parent`
    /// is `None`.
    fn resolve(&self, parent: Option<SchemaId>, name: &str) -> Option<SchemaId> {
        match parent {
            Some(p) => self.child(p, name),
            None => self.top(name),
        }
    }

    /// Declaration position of `id` among its siblings.
    fn position(&self, parent: Option<SchemaId>, id: SchemaId) -> Option<usize> {
        let siblings = match parent {
            Some(p) => self.children(p),
            None => self.tops(),
        };
        siblings.iter().position(|s| *s == id)
    }
}

/// Definition of one schema node and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDef {
    pub name: String,
    pub keyword: Keyword,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default = "default_true")]
    pub config: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaDef>,
}

fn default_true() -> bool {
    true
}

impl SchemaDef {
    fn new(name: &str, keyword: Keyword) -> Self {
        Self {
            name: name.to_string(),
            keyword,
            keys: Vec::new(),
            default: None,
            config: true,
            children: Vec::new(),
        }
    }

    pub fn container(name: &str) -> Self {
        Self::new(name, Keyword::Container)
    }

    pub fn list(name: &str, keys: &[&str]) -> Self {
        let mut def = Self::new(name, Keyword::List);
        def.keys = keys.iter().map(|k| k.to_string()).collect();
        def
    }

    pub fn leaf(name: &str) -> Self {
        Self::new(name, Keyword::Leaf)
    }

    pub fn leaf_list(name: &str) -> Self {
        Self::new(name, Keyword::LeafList)
    }

    /// Append a child definition.
    pub fn child(mut self, child: SchemaDef) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    /// Mark the node as state data.
    pub fn state(mut self) -> Self {
        self.config = false;
        self
    }

    fn validate(&self, path: &str) -> Result<(), SchemaError> {
        let here = format!("{}/{}", path, self.name);
        if self.name.is_empty() {
            return Err(SchemaError::Invalid(format!("empty node name under '{}'", path)));
        }
        if self.keyword.is_terminal() && !self.children.is_empty() {
            return Err(SchemaError::Invalid(format!(
                "{} '{}' cannot have children",
                self.keyword, here
            )));
        }
        if self.default.is_some() && self.keyword != Keyword::Leaf {
            return Err(SchemaError::Invalid(format!(
                "only leaves take a default value ('{}')",
                here
            )));
        }
        match self.keyword {
            Keyword::List => {
                if self.keys.is_empty() {
                    return Err(SchemaError::Invalid(format!("list '{}' has no keys", here)));
                }
                for key in &self.keys {
                    let is_leaf = self
                        .children
                        .iter()
                        .any(|c| &c.name == key && c.keyword == Keyword::Leaf);
                    if !is_leaf {
                        return Err(SchemaError::Invalid(format!(
                            "key '{}' of list '{}' is not a child leaf",
                            key, here
                        )));
                    }
                }
            }
            _ if !self.keys.is_empty() => {
                return Err(SchemaError::Invalid(format!(
                    "only lists take keys ('{}')",
                    here
                )));
            }
            _ => {}
        }
        check_unique(&self.children, &here)?;
        for child in &self.children {
            child.validate(&here)?;
        }
        Ok(())
    }
}

fn check_unique(defs: &[SchemaDef], path: &str) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for def in defs {
        if !seen.insert(def.name.as_str()) {
            return Err(SchemaError::Invalid(format!(
                "duplicate node '{}' under '{}'",
                def.name,
                if path.is_empty() { "/" } else { path }
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    node: Vec<SchemaDef>,
}

#[derive(Debug, Clone)]
struct SchemaNode {
    name: String,
    keyword: Keyword,
    keys: Vec<String>,
    default: Option<String>,
    config: bool,
    children: Vec<SchemaId>,
}

/// An in-memory schema built from [`SchemaDef`]s.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    tops: Vec<SchemaId>,
}

impl Schema {
    /// Build a schema from top-level definitions.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Invalid` for duplicate sibling names, lists
    /// without leaf keys, terminal nodes with children, or defaults on
    /// non-leaves.
    pub fn from_defs(defs: Vec<SchemaDef>) -> Result<Self, SchemaError> {
        check_unique(&defs, "")?;
        for def in &defs {
            def.validate("")?;
        }
        let mut schema = Schema::default();
        for def in defs {
            let id = schema.insert(def);
            schema.tops.push(id);
        }
        Ok(schema)
    }

    /// Parse a schema from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, SchemaError> {
        Self::parse(text, Path::new("<inline>"))
    }

    /// Load a schema definition file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(path).map_err(|e| SchemaError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(text).map_err(|e| SchemaError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_defs(file.node)
    }

    fn insert(&mut self, def: SchemaDef) -> SchemaId {
        let id = SchemaId(self.nodes.len());
        self.nodes.push(SchemaNode {
            name: def.name,
            keyword: def.keyword,
            keys: def.keys,
            default: def.default,
            config: def.config,
            children: Vec::new(),
        });
        for child in def.children {
            let cid = self.insert(child);
            self.nodes[id.0].children.push(cid);
        }
        id
    }

    pub fn is_empty(&self) -> bool {
        self.tops.is_empty()
    }

    fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }
}

impl SchemaProvider for Schema {
    fn top(&self, name: &str) -> Option<SchemaId> {
        self.tops.iter().copied().find(|t| self.node(*t).name == name)
    }

    fn child(&self, parent: SchemaId, name: &str) -> Option<SchemaId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).name == name)
    }

    fn tops(&self) -> &[SchemaId] {
        &self.tops
    }

    fn keyword(&self, id: SchemaId) -> Keyword {
        self.node(id).keyword
    }

    fn keys(&self, id: SchemaId) -> &[String] {
        &self.node(id).keys
    }

    fn name(&self, id: SchemaId) -> &str {
        &self.node(id).name
    }

    fn default_value(&self, id: SchemaId) -> Option<&str> {
        self.node(id).default.as_deref()
    }

    fn children(&self, id: SchemaId) -> &[SchemaId] {
        &self.node(id).children
    }

    fn is_config(&self, id: SchemaId) -> bool {
        self.node(id).config
    }
}
