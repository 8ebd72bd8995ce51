//! Selection extraction: requested GraphQL fields to a storage select tree.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::node::SelectionNode;
use super::rename::FieldRename;

/// One entry of a [SelectTree].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectNode {
    /// A scalar column.
    Scalar,
    /// A relation included as a whole (all of its columns).
    Include { relation: String },
    /// A relation with its own nested selection.
    Nested { relation: String, select: SelectTree },
}

/// Requested fields keyed by their GraphQL name.
///
/// Relation entries carry the storage relation name separately, so the tree
/// keeps the shape of the query while still telling storage what to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectTree {
    fields: BTreeMap<String, SelectNode>,
}

impl SelectTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, merging with an existing entry of the same name.
    pub fn insert(&mut self, name: impl Into<String>, node: SelectNode) {
        let name = name.into();
        let merged = match (self.fields.remove(&name), node) {
            (None, node) => node,
            (
                Some(SelectNode::Nested { select: mut existing, .. }),
                SelectNode::Nested { relation, select },
            ) => {
                for (child, node) in select.fields {
                    existing.insert(child, node);
                }
                SelectNode::Nested {
                    relation,
                    select: existing,
                }
            }
            (Some(existing @ SelectNode::Nested { .. }), _) => existing,
            (Some(_), node) => node,
        };
        self.fields.insert(name, merged);
    }

    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.insert(name, SelectNode::Scalar);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SelectNode> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SelectNode)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Prisma-style JSON: `{"id": true, "roles": {"select": {...}}}`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, node) in &self.fields {
            match node {
                SelectNode::Scalar => {
                    map.insert(name.clone(), Value::Bool(true));
                }
                SelectNode::Include { relation } => {
                    map.insert(relation.clone(), Value::Bool(true));
                }
                SelectNode::Nested { relation, select } => {
                    let mut nested = Map::new();
                    nested.insert("select".to_string(), select.to_json());
                    map.insert(relation.clone(), Value::Object(nested));
                }
            }
        }
        Value::Object(map)
    }
}

/// What to do with a field that has its own nested selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedSelection {
    Recurse,
    Include,
    Skip,
}

type NestedPolicy<'a> = dyn Fn(&[String], &str) -> NestedSelection + Send + Sync + 'a;

/// Walks a selection tree and builds a [SelectTree].
///
/// Introspection fields (`__typename` and friends) are never selected.
#[derive(Default)]
pub struct SelectionExtractor<'a> {
    rename: Option<&'a FieldRename>,
    nested: Option<&'a NestedPolicy<'a>>,
}

impl<'a> SelectionExtractor<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, rename: &'a FieldRename) -> Self {
        self.rename = Some(rename);
        self
    }

    /// Decide per nested field whether to recurse, include, or skip it. The
    /// policy receives the ancestor path and the GraphQL field name.
    pub fn nested(mut self, policy: &'a NestedPolicy<'a>) -> Self {
        self.nested = Some(policy);
        self
    }

    pub fn extract<N: SelectionNode>(&self, fields: &[N]) -> SelectTree {
        let mut ancestors = Vec::new();
        self.extract_at(fields, &mut ancestors)
    }

    fn extract_at<N: SelectionNode>(
        &self,
        fields: &[N],
        ancestors: &mut Vec<String>,
    ) -> SelectTree {
        let mut tree = SelectTree::new();

        for field in fields {
            let name = field.field_name();
            if name.starts_with("__") {
                continue;
            }

            let children = field.child_fields();
            if children.is_empty() {
                tree.insert(name, SelectNode::Scalar);
                continue;
            }

            let path: &[String] = ancestors;
            let decision = self
                .nested
                .map(|policy| policy(path, name))
                .unwrap_or(NestedSelection::Recurse);
            let relation = match self.rename {
                Some(rename) => rename.apply(path, name),
                None => name.to_string(),
            };

            match decision {
                NestedSelection::Skip => {}
                NestedSelection::Include => {
                    tree.insert(name, SelectNode::Include { relation });
                }
                NestedSelection::Recurse => {
                    ancestors.push(name.to_string());
                    let select = self.extract_at(&children, ancestors);
                    ancestors.pop();
                    tree.insert(name, SelectNode::Nested { relation, select });
                }
            }
        }

        tree
    }
}

/// Extract a select tree, recursing into every nested selection.
pub fn extract_selection<N: SelectionNode>(fields: &[N], rename: &FieldRename) -> SelectTree {
    SelectionExtractor::new().rename(rename).extract(fields)
}

#[cfg(test)]
mod tests {
    use async_graphql::parser::parse_query;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::selection::node::operation_fields;

    fn extract(query: &str, rename: &FieldRename) -> SelectTree {
        let document = parse_query(query).unwrap();
        let roots = operation_fields(&document);
        extract_selection(&roots[0].child_fields(), rename)
    }

    #[test]
    fn test_scalars_become_inclusion_flags() {
        let tree = extract("{ allUsers { id name } }", &FieldRename::Identity);

        assert_eq!(tree.to_json(), json!({ "id": true, "name": true }));
    }

    #[test]
    fn test_nested_selections_use_renamed_relation() {
        let rename = FieldRename::map([("roles", "userRoles")]);
        let tree = extract("{ allUsers { id roles { id name } } }", &rename);

        assert_eq!(
            tree.get("roles"),
            Some(&SelectNode::Nested {
                relation: "userRoles".to_string(),
                select: SelectTree::new().scalar("id").scalar("name"),
            })
        );
        assert_eq!(
            tree.to_json(),
            json!({ "id": true, "userRoles": { "select": { "id": true, "name": true } } })
        );
    }

    #[test]
    fn test_rename_function_sees_ancestors() {
        let rename = FieldRename::with(|ancestors, field| {
            if ancestors.is_empty() {
                field.to_string()
            } else {
                format!("{}_{}", ancestors.join("_"), field)
            }
        });
        let tree = extract("{ allUsers { roles { claims { id } } } }", &rename);

        let Some(SelectNode::Nested { relation, select }) = tree.get("roles") else {
            panic!("roles should be nested");
        };
        assert_eq!(relation, "roles");
        assert_eq!(
            select.get("claims"),
            Some(&SelectNode::Nested {
                relation: "roles_claims".to_string(),
                select: SelectTree::new().scalar("id"),
            })
        );
    }

    #[test]
    fn test_fragments_expand_and_typename_is_ignored() {
        let tree = extract(
            "{ allUsers { __typename id ...Extra ... on User { roles { id } } } } \
             fragment Extra on User { email }",
            &FieldRename::Identity,
        );

        assert_eq!(
            tree.to_json(),
            json!({ "id": true, "email": true, "roles": { "select": { "id": true } } })
        );
    }

    #[test]
    fn test_nested_policy() {
        let document = parse_query("{ allUsers { id roles { id } profile { bio } } }").unwrap();
        let roots = operation_fields(&document);
        let policy = |_: &[String], field: &str| match field {
            "roles" => NestedSelection::Include,
            _ => NestedSelection::Skip,
        };
        let tree = SelectionExtractor::new()
            .nested(&policy)
            .extract(&roots[0].child_fields());

        assert_eq!(tree.to_json(), json!({ "id": true, "roles": true }));
    }

    #[test]
    fn test_duplicate_fields_merge() {
        let tree = extract(
            "{ allUsers { roles { id } again: roles { name } } }",
            &FieldRename::Identity,
        );

        assert_eq!(
            tree.to_json(),
            json!({ "roles": { "select": { "id": true, "name": true } } })
        );
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let query = "{ allUsers { id roles { id claims { name } } } }";
        let rename = FieldRename::map([("claims", "userClaims")]);

        assert_eq!(extract(query, &rename), extract(query, &rename));
    }
}
