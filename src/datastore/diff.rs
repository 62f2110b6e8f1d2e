//! datastore::diff
//!
//! Difference vectors between a source and a target tree.
//!
//! Both trees are walked in parallel and siblings are paired with the same
//! identity rule the modify engine uses. Unpaired source nodes are deleted,
//! unpaired target nodes added; paired leaves with different bodies are
//! changed. Only the topmost node of an added or deleted subtree is listed.

use crate::core::schema::{SchemaId, SchemaProvider};
use crate::core::tree::{NodeId, Tree};

use super::modify::find_identical;

/// Differences between a source and a target tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSet {
    /// Nodes of the target with no counterpart in the source.
    pub added: Vec<NodeId>,
    /// Nodes of the source with no counterpart in the target.
    pub deleted: Vec<NodeId>,
    /// Paired leaves whose bodies differ, as `(source, target)`.
    pub changed: Vec<(NodeId, NodeId)>,
}

impl DiffSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }
}

/// Compute the differences from `source` to `target`.
pub fn diff(source: &Tree, target: &Tree, schema: &dyn SchemaProvider) -> DiffSet {
    let mut out = DiffSet::default();
    diff_node(source, source.root(), target, target.root(), None, schema, &mut out);
    out
}

fn diff_node(
    source: &Tree,
    s: NodeId,
    target: &Tree,
    t: NodeId,
    y: Option<SchemaId>,
    schema: &dyn SchemaProvider,
    out: &mut DiffSet,
) {
    let child_schema = |tree: &Tree, node: NodeId| schema.resolve(y, tree.name(node));

    for sc in source.elements(s) {
        let yc = child_schema(source, sc);
        match find_identical(schema, target, t, source, sc, yc) {
            None => out.deleted.push(sc),
            Some(tc) => {
                let terminal = match yc {
                    Some(yc) => schema.keyword(yc).is_terminal(),
                    None => !source.has_elements(sc) && !target.has_elements(tc),
                };
                if terminal {
                    if source.body(sc) != target.body(tc) {
                        out.changed.push((sc, tc));
                    }
                } else {
                    diff_node(source, sc, target, tc, yc, schema, out);
                }
            }
        }
    }

    for tc in target.elements(t) {
        let yc = child_schema(target, tc);
        if find_identical(schema, source, s, target, tc, yc).is_none() {
            out.added.push(tc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Schema, SchemaDef};
    use crate::core::xml;

    fn schema() -> Schema {
        Schema::from_defs(vec![
            SchemaDef::container("interfaces").child(
                SchemaDef::list("interface", &["name"])
                    .child(SchemaDef::leaf("name"))
                    .child(SchemaDef::leaf("mtu")),
            ),
            SchemaDef::container("system")
                .child(SchemaDef::leaf("hostname"))
                .child(SchemaDef::leaf_list("dns")),
        ])
        .unwrap()
    }

    fn tree(text: &str) -> Tree {
        xml::parse_store(text).unwrap()
    }

    #[test]
    fn identical_trees_have_no_diff() {
        let a = tree("<config><system><hostname>r1</hostname></system></config>");
        assert!(diff(&a, &a.clone(), &schema()).is_empty());
    }

    #[test]
    fn changed_leaf() {
        let s = tree("<config><system><hostname>r1</hostname></system></config>");
        let t = tree("<config><system><hostname>r2</hostname></system></config>");
        let d = diff(&s, &t, &schema());
        assert_eq!(d.changed.len(), 1);
        let (sc, tc) = d.changed[0];
        assert_eq!(s.body(sc), Some("r1"));
        assert_eq!(t.body(tc), Some("r2"));
        assert!(d.added.is_empty() && d.deleted.is_empty());
    }

    #[test]
    fn list_entries_added_and_deleted() {
        let s = tree(
            "<config><interfaces><interface><name>eth0</name></interface></interfaces></config>",
        );
        let t = tree(
            "<config><interfaces><interface><name>eth1</name></interface></interfaces></config>",
        );
        let d = diff(&s, &t, &schema());
        assert_eq!(d.deleted.len(), 1);
        assert_eq!(s.find_body(d.deleted[0], "name"), Some("eth0"));
        assert_eq!(d.added.len(), 1);
        assert_eq!(t.find_body(d.added[0], "name"), Some("eth1"));
    }

    #[test]
    fn leaf_list_value_change_is_add_and_delete() {
        let s = tree("<config><system><dns>a</dns></system></config>");
        let t = tree("<config><system><dns>b</dns></system></config>");
        let d = diff(&s, &t, &schema());
        assert_eq!(d.deleted.len(), 1);
        assert_eq!(d.added.len(), 1);
        assert!(d.changed.is_empty());
    }

    #[test]
    fn only_topmost_added_node_listed() {
        let s = tree("<config/>");
        let t = tree("<config><system><hostname>r1</hostname><dns>a</dns></system></config>");
        let d = diff(&s, &t, &schema());
        assert_eq!(d.added.len(), 1);
        assert_eq!(t.name(d.added[0]), "system");
    }

    #[test]
    fn entry_field_change_recurses() {
        let s = tree(
            "<config><interfaces><interface><name>eth0</name><mtu>1500</mtu></interface></interfaces></config>",
        );
        let t = tree(
            "<config><interfaces><interface><name>eth0</name><mtu>9000</mtu></interface></interfaces></config>",
        );
        let d = diff(&s, &t, &schema());
        assert_eq!(d.changed.len(), 1);
        assert_eq!(t.name(d.changed[0].1), "mtu");
    }
}
