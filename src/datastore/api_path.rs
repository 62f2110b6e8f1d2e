//! datastore::api_path
//!
//! Path resolver for key-annotated paths.
//!
//! # Grammar
//!
//! ```text
//! path    = "/" | ( "/" segment )+ [ "/" ]
//! segment = name [ "=" value ( "," value )* ]
//! ```
//!
//! List segments carry one value per key leaf, in key order; leaf-list
//! segments carry the entry value. Containers and leaves take no value.
//!
//! # Creation
//!
//! Walking a path creates what is missing, except when the operation is
//! `delete` (error), `remove` (nothing to do) or `create` at the final
//! segment (left to the modify engine). Containers and list entries created
//! on the way are speculative; list key leaves and leaf-list values are
//! real content.
//!
//! # Example
//!
//! ```
//! use xmldb::core::schema::{Schema, SchemaDef};
//! use xmldb::core::tree::Tree;
//! use xmldb::core::types::EditOp;
//! use xmldb::datastore::api_path::{resolve, Resolution};
//! use xmldb::datastore::modify::PassFlags;
//!
//! let schema = Schema::from_defs(vec![SchemaDef::container("interfaces").child(
//!     SchemaDef::list("interface", &["name"]).child(SchemaDef::leaf("name")),
//! )])
//! .unwrap();
//!
//! let mut tree = Tree::new("config");
//! let mut flags = PassFlags::new();
//! let resolution = resolve(&mut tree, &schema, "/interfaces/interface=eth0", EditOp::Merge, &mut flags).unwrap();
//!
//! let Resolution::Found(found) = resolution else { panic!("expected a target") };
//! let entry = found.target.unwrap();
//! assert_eq!(tree.find_body(entry, "name"), Some("eth0"));
//! ```

use super::error::DatastoreError;
use super::modify::PassFlags;
use crate::core::schema::{Keyword, SchemaId, SchemaProvider};
use crate::core::tree::{NodeId, Tree};
use crate::core::types::EditOp;

/// Location an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Existing or freshly created node; absent when creation is deferred
    /// to the modify engine.
    pub target: Option<NodeId>,
    /// Node the target lives under. The root reports itself.
    pub parent: NodeId,
    /// Schema node of the target; `None` for the root.
    pub schema: Option<SchemaId>,
}

/// Outcome of resolving a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(Resolved),
    /// `remove` of something that does not exist.
    NothingToDo,
}

const MALFORMED_KEY: &str = "malformed key, expected '=<restval>'";

/// Resolve `path` in `tree`, creating missing nodes as `op` allows.
///
/// # Errors
///
/// - `Argument` for a path not starting with `/`, an empty segment, or a
///   list/leaf-list segment without a value
/// - `Schema` for unknown segment names or key arity mismatch
/// - `DoesNotExist` when deleting something missing
/// - `AlreadyExists` when creating a container or leaf that exists
pub fn resolve(
    tree: &mut Tree,
    schema: &dyn SchemaProvider,
    path: &str,
    op: EditOp,
    flags: &mut PassFlags,
) -> Result<Resolution, DatastoreError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(DatastoreError::Argument(format!(
            "invalid path '{}': must start with '/'",
            path
        )));
    };
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let segments: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    };

    let root = tree.root();
    let mut cur = root;
    let mut parent = root;
    let mut y: Option<SchemaId> = None;

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        let (name, restval) = match segment.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (*segment, None),
        };
        if name.is_empty() {
            return Err(DatastoreError::Argument(format!(
                "invalid path '{}': empty segment",
                path
            )));
        }
        let yc = schema.resolve(y, name).ok_or_else(|| {
            DatastoreError::Schema(format!("no schema node found: {}", name))
        })?;
        y = Some(yc);

        let found = match schema.keyword(yc) {
            Keyword::LeafList => {
                let value = restval.ok_or_else(|| DatastoreError::Argument(MALFORMED_KEY.into()))?;
                tree.elements(cur)
                    .find(|c| tree.name(*c) == name && tree.body(*c) == Some(value))
            }
            Keyword::List => {
                let value = restval.ok_or_else(|| DatastoreError::Argument(MALFORMED_KEY.into()))?;
                let keys = schema.keys(yc);
                let values: Vec<&str> = value.split(',').collect();
                if values.len() != keys.len() {
                    return Err(DatastoreError::Schema(format!(
                        "list '{}' key length mismatch: expected {}, got {}",
                        name,
                        keys.len(),
                        values.len()
                    )));
                }
                tree.elements(cur).find(|c| {
                    tree.name(*c) == name
                        && keys
                            .iter()
                            .zip(&values)
                            .all(|(k, v)| tree.find_body(*c, k) == Some(*v))
                })
            }
            Keyword::Container | Keyword::Leaf => {
                let found = tree.find(cur, name);
                if let Some(existing) = found {
                    if op == EditOp::Create && last {
                        return Err(DatastoreError::AlreadyExists(tree.path_of(existing)));
                    }
                }
                found
            }
        };

        let next = match found {
            Some(node) => node,
            None => match op {
                EditOp::Delete => {
                    return Err(DatastoreError::DoesNotExist(path.to_string()));
                }
                EditOp::Remove => return Ok(Resolution::NothingToDo),
                EditOp::Create if last && schema.keyword(yc) != Keyword::List => {
                    return Ok(Resolution::Found(Resolved {
                        target: None,
                        parent: cur,
                        schema: Some(yc),
                    }));
                }
                _ => create_segment(tree, schema, cur, name, yc, restval, flags),
            },
        };
        parent = cur;
        cur = next;
    }

    Ok(Resolution::Found(Resolved {
        target: Some(cur),
        parent,
        schema: y,
    }))
}

/// Value carried by the last segment of `path`, if any.
pub fn final_value(path: &str) -> Option<&str> {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.rsplit('/').next()?.split_once('=').map(|(_, value)| value)
}

fn create_segment(
    tree: &mut Tree,
    schema: &dyn SchemaProvider,
    parent: NodeId,
    name: &str,
    y: SchemaId,
    restval: Option<&str>,
    flags: &mut PassFlags,
) -> NodeId {
    let node = tree.add_element(parent, name);
    tree.set_schema(node, Some(y));
    match schema.keyword(y) {
        Keyword::LeafList => {
            tree.set_body(node, restval.unwrap_or(""));
            flags.record_created(node, false);
        }
        Keyword::List => {
            flags.record_created(node, true);
            let values = restval.unwrap_or("").split(',');
            for (key, value) in schema.keys(y).iter().zip(values) {
                let leaf = tree.add_element(node, key);
                tree.set_schema(leaf, schema.child(y, key));
                tree.set_body(leaf, value);
                flags.record_created(leaf, false);
            }
        }
        Keyword::Container | Keyword::Leaf => flags.record_created(node, true),
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Schema, SchemaDef};
    use crate::core::xml;
    use crate::datastore::error::ErrorKind;

    fn schema() -> Schema {
        Schema::from_defs(vec![
            SchemaDef::container("interfaces").child(
                SchemaDef::list("interface", &["name", "unit"])
                    .child(SchemaDef::leaf("name"))
                    .child(SchemaDef::leaf("unit"))
                    .child(SchemaDef::leaf("mtu")),
            ),
            SchemaDef::container("system")
                .child(SchemaDef::leaf("hostname"))
                .child(SchemaDef::leaf_list("dns")),
        ])
        .unwrap()
    }

    fn sample() -> Tree {
        xml::parse_store(
            "<config>\
               <interfaces><interface><name>eth0</name><unit>0</unit></interface></interfaces>\
               <system><hostname>r1</hostname><dns>a</dns></system>\
             </config>",
        )
        .unwrap()
    }

    fn found(resolution: Resolution) -> Resolved {
        match resolution {
            Resolution::Found(r) => r,
            Resolution::NothingToDo => panic!("expected a target"),
        }
    }

    fn run(tree: &mut Tree, path: &str, op: EditOp) -> Result<Resolution, DatastoreError> {
        resolve(tree, &schema(), path, op, &mut PassFlags::new())
    }

    mod syntax {
        use super::*;

        #[test]
        fn must_be_absolute() {
            let mut tree = sample();
            for path in ["", "system"] {
                let err = run(&mut tree, path, EditOp::Merge).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Argument);
            }
        }

        #[test]
        fn slash_is_root() {
            let mut tree = sample();
            let r = found(run(&mut tree, "/", EditOp::Merge).unwrap());
            assert_eq!(r.target, Some(tree.root()));
            assert!(r.schema.is_none());
        }

        #[test]
        fn trailing_slash_ignored() {
            let mut tree = sample();
            let a = found(run(&mut tree, "/system/", EditOp::Merge).unwrap());
            let b = found(run(&mut tree, "/system", EditOp::Merge).unwrap());
            assert_eq!(a, b);
        }

        #[test]
        fn list_without_value() {
            let mut tree = sample();
            let err = run(&mut tree, "/interfaces/interface", EditOp::Merge).unwrap_err();
            assert_eq!(err.to_string(), "malformed key, expected '=<restval>'");
        }

        #[test]
        fn key_arity_mismatch() {
            let mut tree = sample();
            let err = run(&mut tree, "/interfaces/interface=eth0", EditOp::Merge).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Schema);
            assert!(err.to_string().contains("key length mismatch"));
        }

        #[test]
        fn unknown_segment() {
            let mut tree = sample();
            let err = run(&mut tree, "/system/bogus", EditOp::Merge).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Schema);
        }
    }

    mod lookup {
        use super::*;

        #[test]
        fn existing_list_entry() {
            let mut tree = sample();
            let r = found(run(&mut tree, "/interfaces/interface=eth0,0", EditOp::Merge).unwrap());
            let entry = r.target.unwrap();
            assert_eq!(tree.find_body(entry, "unit"), Some("0"));
            assert_eq!(tree.name(r.parent), "interfaces");
        }

        #[test]
        fn existing_leaf_list_entry() {
            let mut tree = sample();
            let r = found(run(&mut tree, "/system/dns=a", EditOp::Merge).unwrap());
            assert_eq!(tree.body(r.target.unwrap()), Some("a"));
        }
    }

    mod creation {
        use super::*;

        #[test]
        fn list_entry_with_keys() {
            let mut tree = Tree::new("config");
            let mut flags = PassFlags::new();
            let r = found(
                resolve(&mut tree, &schema(), "/interfaces/interface=eth1,5", EditOp::Merge, &mut flags)
                    .unwrap(),
            );
            let entry = r.target.unwrap();
            assert_eq!(tree.find_body(entry, "name"), Some("eth1"));
            assert_eq!(tree.find_body(entry, "unit"), Some("5"));
            assert!(flags.is_speculative(entry));
            assert!(flags.is_speculative(r.parent));
            assert!(!flags.is_speculative(tree.find(entry, "name").unwrap()));
        }

        #[test]
        fn leaf_list_value_is_real() {
            let mut tree = Tree::new("config");
            let mut flags = PassFlags::new();
            let r = found(
                resolve(&mut tree, &schema(), "/system/dns=b", EditOp::Merge, &mut flags).unwrap(),
            );
            let dns = r.target.unwrap();
            assert_eq!(tree.body(dns), Some("b"));
            assert!(!flags.is_speculative(dns));
        }

        #[test]
        fn create_defers_final_segment() {
            let mut tree = sample();
            let r = found(run(&mut tree, "/system/dns=z", EditOp::Create).unwrap());
            assert!(r.target.is_none());
            assert_eq!(tree.name(r.parent), "system");

            let mut empty = Tree::new("config");
            let r = found(run(&mut empty, "/system/hostname", EditOp::Create).unwrap());
            assert!(r.target.is_none());
        }

        #[test]
        fn create_existing_container_fails() {
            let mut tree = sample();
            let err = run(&mut tree, "/system", EditOp::Create).unwrap_err();
            assert!(matches!(err, DatastoreError::AlreadyExists(_)));
        }
    }

    mod missing {
        use super::*;

        #[test]
        fn delete_missing_fails() {
            for path in ["/interfaces/interface=eth9,0", "/system/dns=zz"] {
                let err = run(&mut sample(), path, EditOp::Delete).unwrap_err();
                assert!(err.to_string().starts_with("object to delete does not exist"));
            }
            let err = run(&mut Tree::new("config"), "/system/hostname", EditOp::Delete).unwrap_err();
            assert!(matches!(err, DatastoreError::DoesNotExist(_)));
            assert!(run(&mut sample(), "/system/hostname", EditOp::Delete).is_ok());
        }

        #[test]
        fn remove_missing_is_nothing_to_do() {
            let mut tree = sample();
            assert_eq!(
                run(&mut tree, "/interfaces/interface=eth9,0", EditOp::Remove).unwrap(),
                Resolution::NothingToDo
            );
            assert_eq!(
                run(&mut tree, "/system/dns=zz", EditOp::Remove).unwrap(),
                Resolution::NothingToDo
            );
        }
    }
}
