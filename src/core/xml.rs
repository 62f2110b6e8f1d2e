//! core::xml
//!
//! Store text codec.
//!
//! # Architecture
//!
//! Parsing goes through `quick-xml` events into a [`Tree`]. Element names
//! keep only their local part (`nc:config` becomes `config`); attribute
//! keys are kept verbatim so namespace declarations survive a round trip.
//!
//! The text of an element without element children is its body, byte for
//! byte: edge whitespace survives and `<a></a>` holds an empty body where
//! `<a/>` holds none. Text between elements is indentation and is dropped.
//!
//! Two entry points build trees rooted at `config`:
//! - [`parse_store`] applies the store normalization rules
//! - [`parse_edit`] wraps edit fragments in a `config` root
//!
//! [`to_string`] writes a tree back with two-space indentation.
//!
//! # Example
//!
//! ```
//! use xmldb::core::xml;
//!
//! let tree = xml::parse_store("<config><system><hostname>r1</hostname></system></config>").unwrap();
//! let root = tree.root();
//! let system = tree.find(root, "system").unwrap();
//! assert_eq!(tree.find_body(system, "hostname"), Some("r1"));
//!
//! let text = xml::to_string(&tree);
//! assert!(text.contains("    <hostname>r1</hostname>"));
//! ```

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::tree::{NodeId, NodeKind, Tree};

/// Name of the canonical store root.
pub const CONFIG: &str = "config";

/// Errors from parsing store or edit text.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("text outside of any element at byte {0}")]
    StrayText(usize),

    #[error("unclosed element '{0}'")]
    Unclosed(String),

    #[error("expected a single top-level element, found {0}")]
    MultipleTops(usize),
}

const DOCUMENT: &str = "#document";

/// An element whose end tag has not been seen yet.
struct Open {
    id: NodeId,
    text: String,
    nested: bool,
}

impl Open {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            text: String::new(),
            nested: false,
        }
    }
}

/// Parse text into a tree whose root is a synthetic document node holding
/// every top-level element.
fn parse_document(text: &str) -> Result<Tree, XmlError> {
    let mut reader = Reader::from_str(text);

    let mut tree = Tree::new(DOCUMENT);
    let mut stack = vec![Open::new(tree.root())];

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(e) => {
                let parent = child_opened(&mut tree, &mut stack);
                let id = open_element(&mut tree, parent, &e, position)?;
                stack.push(Open::new(id));
            }
            Event::Empty(e) => {
                let parent = child_opened(&mut tree, &mut stack);
                open_element(&mut tree, parent, &e, position)?;
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some(open) = stack.pop() {
                        close_element(&mut tree, open);
                    }
                }
            }
            Event::Text(t) => {
                let value = t.unescape().map_err(|e| XmlError::Syntax {
                    position,
                    message: e.to_string(),
                })?;
                add_text(&mut stack, &value, position)?;
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                let value = std::str::from_utf8(&raw).map_err(|e| XmlError::Syntax {
                    position,
                    message: e.to_string(),
                })?;
                add_text(&mut stack, value, position)?;
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if stack.len() > 1 {
        let open = &stack[stack.len() - 1];
        return Err(XmlError::Unclosed(tree.name(open.id).to_string()));
    }
    Ok(tree)
}

/// Text seen so far in an element that turns out to have element children
/// is indentation, or mixed content kept trimmed.
fn child_opened(tree: &mut Tree, stack: &mut [Open]) -> NodeId {
    let depth = stack.len();
    let open = &mut stack[depth - 1];
    if depth > 1 {
        flush_mixed(tree, open);
    }
    open.text.clear();
    open.nested = true;
    open.id
}

fn flush_mixed(tree: &mut Tree, open: &Open) {
    let trimmed = open.text.trim();
    if trimmed.is_empty() {
        return;
    }
    let joined = match tree.body(open.id) {
        Some(existing) => format!("{}{}", existing, trimmed),
        None => trimmed.to_string(),
    };
    tree.set_body(open.id, &joined);
}

/// An element without element children keeps its text verbatim as its
/// body, including an empty one.
fn close_element(tree: &mut Tree, open: Open) {
    if open.nested {
        flush_mixed(tree, &open);
    } else {
        tree.set_body(open.id, &open.text);
    }
}

fn add_text(stack: &mut [Open], value: &str, position: usize) -> Result<(), XmlError> {
    let depth = stack.len();
    if depth == 1 {
        if value.trim().is_empty() {
            return Ok(());
        }
        return Err(XmlError::StrayText(position));
    }
    stack[depth - 1].text.push_str(value);
    Ok(())
}

fn open_element(
    tree: &mut Tree,
    parent: NodeId,
    start: &BytesStart<'_>,
    position: usize,
) -> Result<NodeId, XmlError> {
    let syntax = |message: String| XmlError::Syntax { position, message };
    let local = start.local_name();
    let name = std::str::from_utf8(local.as_ref()).map_err(|e| syntax(e.to_string()))?;
    let id = tree.add_element(parent, name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| syntax(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| syntax(e.to_string()))?;
        let value = attr.unescape_value().map_err(|e| syntax(e.to_string()))?;
        tree.set_attribute(id, key, &value);
    }
    Ok(id)
}

/// Parse store file contents into a tree rooted at `config`.
///
/// Normalization:
/// - empty or whitespace-only text gives an empty `config` root
/// - a single top element named `config` is the root
/// - a single top element whose only element child is `config` is
///   unwrapped to that child
/// - any other single top element is renamed `config`
///
/// # Errors
///
/// Returns `XmlError::MultipleTops` if the text holds more than one
/// top-level element, or a syntax error for malformed XML.
pub fn parse_store(text: &str) -> Result<Tree, XmlError> {
    let mut tree = parse_document(text)?;
    let tops: Vec<NodeId> = tree.elements(tree.root()).collect();
    match tops.as_slice() {
        [] => Ok(Tree::new(CONFIG)),
        [top] => {
            let top = *top;
            let inner: Vec<NodeId> = tree.elements(top).collect();
            let root = match inner.as_slice() {
                [only] if tree.name(top) != CONFIG && tree.name(*only) == CONFIG => *only,
                _ => top,
            };
            tree.set_root(root);
            tree.set_name(root, CONFIG);
            Ok(tree)
        }
        many => Err(XmlError::MultipleTops(many.len())),
    }
}

/// Parse edit text into a tree rooted at `config`.
///
/// A single top element named `config` is the root; otherwise every
/// top-level element becomes a child of a new `config` root.
pub fn parse_edit(text: &str) -> Result<Tree, XmlError> {
    let mut tree = parse_document(text)?;
    let tops: Vec<NodeId> = tree.elements(tree.root()).collect();
    if let [top] = tops.as_slice() {
        if tree.name(*top) == CONFIG {
            tree.set_root(*top);
            return Ok(tree);
        }
    }
    let doc = tree.root();
    tree.set_name(doc, CONFIG);
    Ok(tree)
}

/// Serialize a tree with two-space indentation.
pub fn to_string(tree: &Tree) -> String {
    let mut out = String::new();
    write_node(tree, tree.root(), 0, &mut out);
    out
}

/// Serialize the subtree rooted at `node`.
pub fn node_to_string(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, 0, &mut out);
    out
}

fn write_node(tree: &Tree, id: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(tree.name(id));
    for (key, value) in tree.attributes(id) {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }

    let content: Vec<NodeId> = tree
        .children(id)
        .iter()
        .copied()
        .filter(|c| tree.kind(*c) != NodeKind::Attribute)
        .collect();

    match content.as_slice() {
        [] => out.push_str("/>\n"),
        [only] if tree.kind(*only) == NodeKind::Body => {
            out.push('>');
            out.push_str(&escape(tree.value(*only).unwrap_or("")));
            out.push_str("</");
            out.push_str(tree.name(id));
            out.push_str(">\n");
        }
        children => {
            out.push_str(">\n");
            for c in children {
                if tree.kind(*c) == NodeKind::Body {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(&escape(tree.value(*c).unwrap_or("")));
                    out.push('\n');
                } else {
                    write_node(tree, *c, depth + 1, out);
                }
            }
            out.push_str(&indent);
            out.push_str("</");
            out.push_str(tree.name(id));
            out.push_str(">\n");
        }
    }
}

/// Render a subtree as JSON, keyed by its element name.
///
/// Leaves become strings, empty elements `null`, interior elements objects;
/// repeated sibling names collapse into arrays. Attributes are dropped.
pub fn to_json(tree: &Tree, node: NodeId) -> Value {
    let mut top = Map::new();
    top.insert(tree.name(node).to_string(), json_value(tree, node));
    Value::Object(top)
}

fn json_value(tree: &Tree, id: NodeId) -> Value {
    if !tree.has_elements(id) {
        return match tree.body(id) {
            Some(body) => Value::String(body.to_string()),
            None => Value::Null,
        };
    }
    let mut map = Map::new();
    for c in tree.elements(id) {
        let value = json_value(tree, c);
        match map.get_mut(tree.name(c)) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(tree.name(c).to_string(), value);
            }
        }
    }
    Value::Object(map)
}
