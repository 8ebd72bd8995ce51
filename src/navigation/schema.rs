//! Schema index: every link ever registered, the types root fields yield, and
//! storage model names overridden per type.
//!
//! Unlike the [NavigationRegistry](super::NavigationRegistry), nothing is
//! removed from the index. Generated resolvers share it and read it while
//! resolving paths at request time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::link::NavigationLink;

#[derive(Debug, Default)]
struct SchemaEntries {
    links: Vec<NavigationLink>,
    root_fields: HashMap<String, String>,
    table_names: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    entries: Arc<RwLock<SchemaEntries>>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_links(&self, links: &[NavigationLink]) {
        self.entries.write().links.extend(links.iter().cloned());
    }

    /// Record the model type a root query field yields.
    pub fn add_root_field(&self, field: impl Into<String>, type_name: impl Into<String>) {
        self.entries
            .write()
            .root_fields
            .insert(field.into(), type_name.into());
    }

    pub fn root_field_type(&self, field: &str) -> Option<String> {
        self.entries.read().root_fields.get(field).cloned()
    }

    /// Query `type_name` through the storage model `table` instead of the
    /// name its links declare.
    pub fn set_table_name(&self, type_name: impl Into<String>, table: impl Into<String>) {
        self.entries
            .write()
            .table_names
            .insert(type_name.into(), table.into());
    }

    pub fn table_name_of(&self, type_name: &str) -> Option<String> {
        self.entries.read().table_names.get(type_name).cloned()
    }

    /// Links exposing `property`, restricted to `source` when given.
    pub fn links_by_property(&self, property: &str, source: Option<&str>) -> Vec<NavigationLink> {
        self.entries
            .read()
            .links
            .iter()
            .filter(|link| link.source_property == property)
            .filter(|link| source.is_none_or(|s| link.source == s))
            .cloned()
            .collect()
    }

    /// Properties of `type_name` that resolve to a list.
    pub fn list_properties_of(&self, type_name: &str) -> HashSet<String> {
        self.entries
            .read()
            .links
            .iter()
            .filter(|link| link.source == type_name && link.is_list())
            .map(|link| link.source_property.clone())
            .collect()
    }

    pub fn links_of(&self, type_name: &str) -> Vec<NavigationLink> {
        self.entries
            .read()
            .links
            .iter()
            .filter(|link| link.source == type_name)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationDeclaration;

    fn index() -> SchemaIndex {
        let index = SchemaIndex::new();
        let mut links = NavigationDeclaration::one_to_many("User", "roles", "UserRole")
            .into_links()
            .unwrap();
        links.extend(
            NavigationDeclaration::many_to_many("UserRole", "claims", "UserClaim", "roles")
                .into_links()
                .unwrap(),
        );
        index.add_links(&links);
        index.add_root_field("allUsers", "User");
        index
    }

    #[test]
    fn test_links_by_property() {
        let index = index();

        assert_eq!(index.links_by_property("roles", None).len(), 2);
        let from_user = index.links_by_property("roles", Some("User"));
        assert_eq!(from_user.len(), 1);
        assert_eq!(from_user[0].target, "UserRole");
        assert!(index.links_by_property("missing", None).is_empty());
    }

    #[test]
    fn test_root_fields_and_list_properties() {
        let index = index();

        assert_eq!(index.root_field_type("allUsers").as_deref(), Some("User"));
        assert_eq!(index.root_field_type("allClaims"), None);
        assert!(index.list_properties_of("UserRole").contains("claims"));
        assert!(index.list_properties_of("Profile").is_empty());
    }

    #[test]
    fn test_table_name_overrides() {
        let index = index();
        assert_eq!(index.table_name_of("UserRole"), None);

        index.set_table_name("UserRole", "accountRole");
        assert_eq!(index.table_name_of("UserRole").as_deref(), Some("accountRole"));
    }

    #[test]
    fn test_clones_share_entries() {
        let index = SchemaIndex::new();
        let shared = index.clone();
        index.add_root_field("allClaims", "UserClaim");

        assert_eq!(shared.root_field_type("allClaims").as_deref(), Some("UserClaim"));
    }
}
