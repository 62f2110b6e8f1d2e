//! datastore::get
//!
//! Read pipeline applied to a freshly loaded store tree.
//!
//! # Pipeline
//!
//! 1. Evaluate the query (default `/`) and mark the returned nodes
//! 2. Keep marked nodes, their subtrees and their ancestors; the root stays
//! 3. Attach schema links to every element
//! 4. Add schema default leaves missing from containers and list entries
//! 5. Order siblings by schema declaration order (stable)
//! 6. Check that every list entry carries all its key leaves

use std::collections::HashMap;

use super::error::DatastoreError;
use crate::core::query::{NamespaceContext, QueryEvaluator};
use crate::core::schema::{Keyword, SchemaProvider};
use crate::core::tree::{FlagSet, NodeId, NodeKind, Tree};

/// Result of a read.
///
/// `matches` index into `tree`; they are meaningless for any other tree.
#[derive(Debug, Clone)]
pub struct GetResult {
    pub tree: Tree,
    pub matches: Vec<NodeId>,
}

/// Run the read pipeline over `tree`.
pub fn prepare(
    mut tree: Tree,
    schema: &dyn SchemaProvider,
    evaluator: &dyn QueryEvaluator,
    ns: &NamespaceContext,
    query: Option<&str>,
) -> Result<GetResult, DatastoreError> {
    let matches = evaluator.evaluate(&tree, ns, query.unwrap_or("/"))?;
    let marks: FlagSet = matches.iter().copied().collect();
    tree.retain_flagged(&marks);

    populate(&mut tree, schema)?;
    add_defaults(&mut tree, schema);
    order(&mut tree, schema);
    sanity(&tree, schema)?;

    Ok(GetResult { tree, matches })
}

/// Attach schema links to every element below the root.
///
/// # Errors
///
/// Returns `Validation` for an element with no schema node.
pub fn populate(tree: &mut Tree, schema: &dyn SchemaProvider) -> Result<(), DatastoreError> {
    let root = tree.root();
    for node in tree.descendants(root).into_iter().skip(1) {
        let parent_schema = match tree.parent(node) {
            Some(p) if p != root => tree.schema(p),
            _ => None,
        };
        let y = schema.resolve(parent_schema, tree.name(node)).ok_or_else(|| {
            DatastoreError::Validation(format!("no schema node for '{}'", tree.path_of(node)))
        })?;
        tree.set_schema(node, Some(y));
    }
    Ok(())
}

/// Add missing default leaves to containers and list entries.
pub fn add_defaults(tree: &mut Tree, schema: &dyn SchemaProvider) {
    let root = tree.root();
    for node in tree.descendants(root) {
        let Some(y) = tree.schema(node) else { continue };
        if !matches!(schema.keyword(y), Keyword::Container | Keyword::List) {
            continue;
        }
        for yc in schema.children(y).to_vec() {
            if schema.keyword(yc) != Keyword::Leaf {
                continue;
            }
            let Some(value) = schema.default_value(yc) else { continue };
            let name = schema.name(yc);
            if tree.find(node, name).is_none() {
                let leaf = tree.add_element(node, name);
                tree.set_body(leaf, value);
                tree.set_schema(leaf, Some(yc));
            }
        }
    }
}

/// Sort element siblings by schema declaration order.
///
/// Non-element children keep their place ahead of elements; elements of
/// the same schema node keep their relative order.
pub fn order(tree: &mut Tree, schema: &dyn SchemaProvider) {
    let root = tree.root();
    for node in tree.descendants(root) {
        let parent_schema = if node == root { None } else { tree.schema(node) };
        let children = tree.children(node).to_vec();
        if children.len() < 2 {
            continue;
        }
        let mut positions: HashMap<NodeId, usize> = HashMap::new();
        for c in &children {
            let pos = tree
                .schema(*c)
                .and_then(|yc| schema.position(parent_schema, yc))
                .unwrap_or(usize::MAX);
            positions.insert(*c, pos);
        }
        let (mut ordered, mut elements): (Vec<NodeId>, Vec<NodeId>) = children
            .into_iter()
            .partition(|c| tree.kind(*c) != NodeKind::Element);
        elements.sort_by_key(|c| positions.get(c).copied().unwrap_or(usize::MAX));
        ordered.extend(elements);
        tree.reorder_children(node, ordered);
    }
}

/// Check that no element is state data.
///
/// Expects schema links from [`populate`].
pub fn config_only(tree: &Tree, schema: &dyn SchemaProvider) -> Result<(), DatastoreError> {
    for node in tree.descendants(tree.root()) {
        let Some(y) = tree.schema(node) else { continue };
        if !schema.is_config(y) {
            return Err(DatastoreError::Validation(format!(
                "'{}' is state data and cannot be stored",
                tree.path_of(node)
            )));
        }
    }
    Ok(())
}

/// Check that every list entry carries all its key leaves.
pub fn sanity(tree: &Tree, schema: &dyn SchemaProvider) -> Result<(), DatastoreError> {
    for node in tree.descendants(tree.root()) {
        let Some(y) = tree.schema(node) else { continue };
        if schema.keyword(y) != Keyword::List {
            continue;
        }
        for key in schema.keys(y) {
            if tree.find(node, key).is_none() {
                return Err(DatastoreError::Validation(format!(
                    "list entry '{}' is missing key '{}'",
                    tree.path_of(node),
                    key
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::PathQuery;
    use crate::core::schema::{Schema, SchemaDef};
    use crate::core::xml;
    use crate::datastore::error::ErrorKind;

    fn schema() -> Schema {
        Schema::from_defs(vec![
            SchemaDef::container("interfaces").child(
                SchemaDef::list("interface", &["name"])
                    .child(SchemaDef::leaf("name"))
                    .child(SchemaDef::leaf("mtu").with_default("1500"))
                    .child(SchemaDef::leaf("description")),
            ),
            SchemaDef::container("system")
                .child(SchemaDef::leaf("hostname"))
                .child(SchemaDef::leaf_list("dns")),
        ])
        .unwrap()
    }

    fn run(text: &str, query: Option<&str>) -> Result<GetResult, DatastoreError> {
        prepare(
            xml::parse_store(text).unwrap(),
            &schema(),
            &PathQuery,
            &NamespaceContext::new(),
            query,
        )
    }

    #[test]
    fn full_tree_by_default() {
        let result = run("<config><system><hostname>r1</hostname></system></config>", None).unwrap();
        assert_eq!(result.matches, vec![result.tree.root()]);
        assert!(result.tree.find(result.tree.root(), "system").is_some());
    }

    #[test]
    fn query_prunes_unmarked() {
        let result = run(
            "<config>\
               <interfaces>\
                 <interface><name>eth0</name><mtu>9000</mtu></interface>\
                 <interface><name>eth1</name><mtu>1400</mtu></interface>\
               </interfaces>\
               <system><hostname>r1</hostname></system>\
             </config>",
            Some("/interfaces/interface[name='eth1']"),
        )
        .unwrap();
        let tree = &result.tree;
        assert!(tree.find(tree.root(), "system").is_none());
        let ifs = tree.find(tree.root(), "interfaces").unwrap();
        assert_eq!(tree.element_count(ifs), 1);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(tree.find_body(result.matches[0], "mtu"), Some("1400"));
    }

    #[test]
    fn empty_result_keeps_root() {
        let result = run("<config><system><hostname>r1</hostname></system></config>", Some("/nothing"))
            .unwrap();
        assert!(result.matches.is_empty());
        assert!(!result.tree.has_elements(result.tree.root()));
    }

    #[test]
    fn defaults_added() {
        let result = run(
            "<config><interfaces><interface><name>eth0</name></interface></interfaces></config>",
            None,
        )
        .unwrap();
        let tree = &result.tree;
        let ifs = tree.find(tree.root(), "interfaces").unwrap();
        let entry = tree.find(ifs, "interface").unwrap();
        assert_eq!(tree.find_body(entry, "mtu"), Some("1500"));
    }

    #[test]
    fn siblings_ordered_by_schema() {
        let result = run(
            "<config>\
               <system><dns>b</dns><hostname>r1</hostname><dns>a</dns></system>\
               <interfaces><interface><description>d</description><name>e</name></interface></interfaces>\
             </config>",
            None,
        )
        .unwrap();
        let text = xml::to_string(&result.tree);
        let expected = "<config>\n  <interfaces>\n    <interface>\n      <name>e</name>\n      <mtu>1500</mtu>\n      <description>d</description>\n    </interface>\n  </interfaces>\n  <system>\n    <hostname>r1</hostname>\n    <dns>b</dns>\n    <dns>a</dns>\n  </system>\n</config>\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn unknown_node_fails_populate() {
        let err = run("<config><bogus/></config>", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("/bogus"));
    }

    #[test]
    fn missing_key_fails_sanity() {
        let err = run(
            "<config><interfaces><interface><mtu>1</mtu></interface></interfaces></config>",
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing key 'name'"));
    }

    #[test]
    fn state_nodes_fail_config_check() {
        let schema = Schema::from_defs(vec![SchemaDef::container("system")
            .child(SchemaDef::leaf("hostname"))
            .child(SchemaDef::leaf("uptime").state())])
        .unwrap();
        let mut tree =
            xml::parse_store("<config><system><hostname>r1</hostname></system></config>").unwrap();
        populate(&mut tree, &schema).unwrap();
        assert!(config_only(&tree, &schema).is_ok());

        let mut tree = xml::parse_store("<config><system><uptime>5</uptime></system></config>").unwrap();
        populate(&mut tree, &schema).unwrap();
        let err = config_only(&tree, &schema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("/system/uptime"));
    }

    #[test]
    fn bad_query_is_argument_error() {
        let err = run("<config/>", Some("relative")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
