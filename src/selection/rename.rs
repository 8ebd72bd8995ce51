//! Field renaming from GraphQL names to storage names.

use std::collections::HashMap;
use std::sync::Arc;

use crate::navigation::SchemaIndex;

/// Maps a GraphQL field name to the name storage knows it by.
///
/// The function form receives the ancestor path (GraphQL names, root first)
/// along with the field name.
#[derive(Clone, Default)]
pub enum FieldRename {
    #[default]
    Identity,
    Map(HashMap<String, String>),
    With(Arc<dyn Fn(&[String], &str) -> String + Send + Sync>),
}

impl FieldRename {
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        FieldRename::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn with<F>(rename: F) -> Self
    where
        F: Fn(&[String], &str) -> String + Send + Sync + 'static,
    {
        FieldRename::With(Arc::new(rename))
    }

    /// Rename each field to the storage relation of the link declared for it
    /// by the type that owns it.
    ///
    /// Top-level fields belong to `root`; deeper fields belong to the type
    /// reached by following the ancestor properties from `root`. Fields with
    /// no such link keep their name.
    pub fn relations(schema: SchemaIndex, root: impl Into<String>) -> Self {
        let root = root.into();
        FieldRename::with(move |ancestors, field| {
            let owner = ancestors.iter().try_fold(root.clone(), |owner, ancestor| {
                schema
                    .links_by_property(ancestor, Some(owner.as_str()))
                    .into_iter()
                    .next()
                    .map(|link| link.target)
            });
            owner
                .and_then(|owner| {
                    schema
                        .links_by_property(field, Some(owner.as_str()))
                        .into_iter()
                        .next()
                })
                .map(|link| link.source_relation)
                .unwrap_or_else(|| field.to_string())
        })
    }

    pub fn apply(&self, ancestors: &[String], field: &str) -> String {
        match self {
            FieldRename::Identity => field.to_string(),
            FieldRename::Map(map) => map.get(field).cloned().unwrap_or_else(|| field.to_string()),
            FieldRename::With(rename) => rename(ancestors, field),
        }
    }
}

impl std::fmt::Debug for FieldRename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRename::Identity => f.write_str("Identity"),
            FieldRename::Map(map) => f.debug_tuple("Map").field(map).finish(),
            FieldRename::With(_) => f.write_str("With(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationDeclaration;

    #[test]
    fn test_apply() {
        let map = FieldRename::map([("roles", "userRoles")]);
        assert_eq!(map.apply(&[], "roles"), "userRoles");
        assert_eq!(map.apply(&[], "name"), "name");

        let with =
            FieldRename::with(|ancestors, field| format!("{}:{}", ancestors.join("."), field));
        assert_eq!(
            with.apply(&["allUsers".to_string()], "roles"),
            "allUsers:roles"
        );

        assert_eq!(FieldRename::Identity.apply(&[], "id"), "id");
    }

    #[test]
    fn test_relations_follow_owning_type() {
        let schema = SchemaIndex::new();
        for declaration in [
            NavigationDeclaration::one_to_many("User", "roles", "UserRole")
                .source_relation("userRoles"),
            NavigationDeclaration::many_to_one("UserRole", "owner", "User")
                .source_relation("user")
                .reverse_table("roles"),
        ] {
            schema.add_links(&declaration.into_links().unwrap());
        }

        let from_role = FieldRename::relations(schema.clone(), "UserRole");
        assert_eq!(from_role.apply(&[], "owner"), "user");
        assert_eq!(from_role.apply(&[], "name"), "name");
        assert_eq!(from_role.apply(&["owner".to_string()], "roles"), "userRoles");

        let from_user = FieldRename::relations(schema, "User");
        assert_eq!(from_user.apply(&[], "roles"), "userRoles");
        assert_eq!(from_user.apply(&["roles".to_string()], "owner"), "user");
        assert_eq!(from_user.apply(&["friends".to_string()], "owner"), "owner");
    }
}
