//! core::query
//!
//! Query evaluation over configuration trees.
//!
//! # Architecture
//!
//! The Get pipeline selects nodes through the [`QueryEvaluator`] trait. The
//! bundled [`PathQuery`] evaluates a location-path subset:
//!
//! - `/` selects the root
//! - `/a/b` child steps, `//b` descendant steps, `*` any element
//! - `pfx:name` names; the prefix must be bound in the [`NamespaceContext`]
//! - predicates `[child='v']`, `[child="v"]`, `[.='v']` and positional `[n]`
//!
//! Paths are absolute and evaluated from the tree root. Positional
//! predicates count within the candidates produced for each context node.
//! Results come back in document order without duplicates.
//!
//! # Example
//!
//! ```
//! use xmldb::core::query::{NamespaceContext, PathQuery, QueryEvaluator};
//! use xmldb::core::xml;
//!
//! let tree = xml::parse_store(
//!     "<config><ifs><if><name>eth0</name></if><if><name>eth1</name></if></ifs></config>",
//! )
//! .unwrap();
//!
//! let hits = PathQuery
//!     .evaluate(&tree, &NamespaceContext::new(), "/ifs/if[name='eth1']")
//!     .unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(tree.find_body(hits[0], "name"), Some("eth1"));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::core::tree::{NodeId, Tree};

/// Errors from query parsing or evaluation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("invalid query '{query}': {message}")]
    Syntax { query: String, message: String },

    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),
}

/// Prefix to namespace URI bindings used when resolving query names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: BTreeMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding.
    pub fn with(mut self, prefix: &str, uri: &str) -> Self {
        self.insert(prefix, uri);
        self
    }

    pub fn insert(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }
}

/// Selects nodes of a tree.
pub trait QueryEvaluator {
    /// Evaluate `query` against `tree`.
    ///
    /// Returned nodes belong to `tree` and are in document order.
    fn evaluate(
        &self,
        tree: &Tree,
        ns: &NamespaceContext,
        query: &str,
    ) -> Result<Vec<NodeId>, QueryError>;
}

/// Location-path evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    ChildEquals { name: String, value: String },
    SelfEquals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

struct Parser<'a> {
    query: &'a str,
    chars: Vec<char>,
    pos: usize,
    ns: &'a NamespaceContext,
}

impl<'a> Parser<'a> {
    fn new(query: &'a str, ns: &'a NamespaceContext) -> Self {
        Self {
            query,
            chars: query.chars().collect(),
            pos: 0,
            ns,
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::Syntax {
            query: self.query.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), QueryError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}' at offset {}", c, self.pos)))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<Vec<Step>, QueryError> {
        if self.chars.is_empty() {
            return Err(QueryError::Empty);
        }
        if self.query == "/" {
            return Ok(Vec::new());
        }
        if self.peek() != Some('/') {
            return Err(self.error("query must be absolute"));
        }
        let mut steps = Vec::new();
        while self.pos < self.chars.len() {
            self.expect('/')?;
            let axis = if self.eat('/') {
                Axis::Descendant
            } else {
                Axis::Child
            };
            let test = if self.eat('*') {
                NameTest::Any
            } else {
                NameTest::Name(self.qualified_name()?)
            };
            let mut predicates = Vec::new();
            while self.eat('[') {
                predicates.push(self.predicate()?);
            }
            steps.push(Step {
                axis,
                test,
                predicates,
            });
        }
        Ok(steps)
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Name with an optional bound prefix; returns the local part.
    fn qualified_name(&mut self) -> Result<String, QueryError> {
        let first = self.name();
        if first.is_empty() {
            return Err(self.error(format!("expected a name at offset {}", self.pos)));
        }
        if !self.eat(':') {
            return Ok(first);
        }
        if self.ns.resolve(&first).is_none() {
            return Err(QueryError::UnknownPrefix(first));
        }
        let local = self.name();
        if local.is_empty() {
            return Err(self.error(format!("expected a name after '{}:'", first)));
        }
        Ok(local)
    }

    fn predicate(&mut self) -> Result<Predicate, QueryError> {
        self.skip_ws();
        let predicate = if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            let n: usize = digits
                .parse()
                .map_err(|_| self.error(format!("invalid position '{}'", digits)))?;
            if n == 0 {
                return Err(self.error("positions start at 1"));
            }
            Predicate::Position(n)
        } else if self.peek() == Some('.') && self.chars.get(self.pos + 1) != Some(&'.') {
            self.pos += 1;
            Predicate::SelfEquals(self.comparison()?)
        } else {
            let name = self.qualified_name()?;
            let value = self.comparison()?;
            Predicate::ChildEquals { name, value }
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(predicate)
    }

    /// `= 'literal'` with optional surrounding whitespace.
    fn comparison(&mut self) -> Result<String, QueryError> {
        self.skip_ws();
        self.expect('=')?;
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("unterminated literal"));
        }
        let value: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(value)
    }
}

impl PathQuery {
    fn matches(tree: &Tree, node: NodeId, test: &NameTest) -> bool {
        match test {
            NameTest::Any => true,
            NameTest::Name(name) => tree.name(node) == name,
        }
    }

    fn filter(tree: &Tree, candidates: Vec<NodeId>, predicate: &Predicate) -> Vec<NodeId> {
        match predicate {
            Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
            Predicate::ChildEquals { name, value } => candidates
                .into_iter()
                .filter(|c| {
                    tree.elements(*c)
                        .any(|e| tree.name(e) == name && tree.body(e) == Some(value.as_str()))
                })
                .collect(),
            Predicate::SelfEquals(value) => candidates
                .into_iter()
                .filter(|c| tree.body(*c) == Some(value.as_str()))
                .collect(),
        }
    }
}

impl QueryEvaluator for PathQuery {
    fn evaluate(
        &self,
        tree: &Tree,
        ns: &NamespaceContext,
        query: &str,
    ) -> Result<Vec<NodeId>, QueryError> {
        let steps = Parser::new(query.trim(), ns).parse()?;
        let order: HashMap<NodeId, usize> = tree
            .descendants(tree.root())
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();

        let mut context = vec![tree.root()];
        for step in &steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for ctx in &context {
                let candidates: Vec<NodeId> = match step.axis {
                    Axis::Child => tree.elements(*ctx).collect(),
                    Axis::Descendant => tree.descendants(*ctx).into_iter().skip(1).collect(),
                };
                let mut selected: Vec<NodeId> = candidates
                    .into_iter()
                    .filter(|c| Self::matches(tree, *c, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    selected = Self::filter(tree, selected, predicate);
                }
                next.extend(selected.into_iter().filter(|n| seen.insert(*n)));
            }
            next.sort_by_key(|n| order.get(n).copied().unwrap_or(usize::MAX));
            context = next;
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::xml;

    fn sample() -> Tree {
        xml::parse_store(
            "<config>\
               <ifs>\
                 <if><name>eth0</name><mtu>1500</mtu></if>\
                 <if><name>eth1</name><mtu>9000</mtu></if>\
               </ifs>\
               <system><name>r1</name><dns>8.8.8.8</dns><dns>1.1.1.1</dns></system>\
             </config>",
        )
        .unwrap()
    }

    fn run(tree: &Tree, query: &str) -> Vec<String> {
        PathQuery
            .evaluate(tree, &NamespaceContext::new(), query)
            .unwrap()
            .into_iter()
            .map(|n| tree.path_of(n))
            .collect()
    }

    mod selection {
        use super::*;

        #[test]
        fn slash_selects_root() {
            let tree = sample();
            let hits = PathQuery
                .evaluate(&tree, &NamespaceContext::new(), "/")
                .unwrap();
            assert_eq!(hits, vec![tree.root()]);
        }

        #[test]
        fn child_steps() {
            let tree = sample();
            assert_eq!(run(&tree, "/ifs/if").len(), 2);
            assert_eq!(run(&tree, "/system/name"), vec!["/system/name"]);
            assert!(run(&tree, "/nothing").is_empty());
        }

        #[test]
        fn descendant_step_in_document_order() {
            let tree = sample();
            assert_eq!(
                run(&tree, "//name"),
                vec!["/ifs/if/name", "/ifs/if/name", "/system/name"]
            );
        }

        #[test]
        fn wildcard() {
            let tree = sample();
            assert_eq!(run(&tree, "/*"), vec!["/ifs", "/system"]);
        }
    }

    mod predicates {
        use super::*;

        #[test]
        fn child_equals() {
            let tree = sample();
            let hits = PathQuery
                .evaluate(&tree, &NamespaceContext::new(), "/ifs/if[name=\"eth1\"]/mtu")
                .unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(tree.body(hits[0]), Some("9000"));
        }

        #[test]
        fn self_equals() {
            let tree = sample();
            let hits = PathQuery
                .evaluate(&tree, &NamespaceContext::new(), "/system/dns[.='1.1.1.1']")
                .unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(tree.body(hits[0]), Some("1.1.1.1"));
        }

        #[test]
        fn position() {
            let tree = sample();
            let hits = PathQuery
                .evaluate(&tree, &NamespaceContext::new(), "/ifs/if[2]/name")
                .unwrap();
            assert_eq!(tree.body(hits[0]), Some("eth1"));
            assert!(run(&tree, "/ifs/if[3]").is_empty());
        }

        #[test]
        fn whitespace_inside_predicate() {
            let tree = sample();
            assert_eq!(run(&tree, "/ifs/if[ name = 'eth0' ]").len(), 1);
        }
    }

    mod namespaces {
        use super::*;

        #[test]
        fn bound_prefix_is_stripped() {
            let tree = sample();
            let ns = NamespaceContext::new().with("x", "urn:example");
            let hits = PathQuery.evaluate(&tree, &ns, "/x:system/x:name").unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(ns.resolve("x"), Some("urn:example"));
        }

        #[test]
        fn unknown_prefix_rejected() {
            let tree = sample();
            let err = PathQuery
                .evaluate(&tree, &NamespaceContext::new(), "/y:system")
                .unwrap_err();
            assert_eq!(err, QueryError::UnknownPrefix("y".into()));
        }
    }

    mod syntax {
        use super::*;

        fn err(query: &str) -> QueryError {
            PathQuery
                .evaluate(&sample(), &NamespaceContext::new(), query)
                .unwrap_err()
        }

        #[test]
        fn empty() {
            assert_eq!(err(""), QueryError::Empty);
        }

        #[test]
        fn relative_rejected() {
            assert!(err("ifs").to_string().contains("absolute"));
        }

        #[test]
        fn trailing_slash_rejected() {
            assert!(matches!(err("/ifs/"), QueryError::Syntax { .. }));
        }

        #[test]
        fn unterminated_literal() {
            assert!(err("/ifs/if[name='eth0]").to_string().contains("unterminated"));
        }

        #[test]
        fn zero_position() {
            assert!(err("/ifs/if[0]").to_string().contains("start at 1"));
        }
    }
}
