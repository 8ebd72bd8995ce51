//! Resolver generation
//!
//! [NavigationBuilder] owns the registries during assembly. Generating a
//! group turns each registration of the group into one resolver per link of
//! its type.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::NavigationError;
use crate::navigation::{
    NavigationDeclaration, NavigationRegistry, ResolverGroups, ResolverRegistration, SchemaIndex,
};

use super::handler::NavigationResolver;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Leave the group's registrations in place after generating.
    pub keep_registrations: bool,
}

/// Resolvers generated for one type.
#[derive(Debug, Clone)]
pub struct TypeResolvers {
    pub type_name: String,
    pub resolvers: Vec<Arc<NavigationResolver>>,
}

impl TypeResolvers {
    /// Resolver answering `property`.
    pub fn get(&self, property: &str) -> Option<&Arc<NavigationResolver>> {
        self.resolvers
            .iter()
            .find(|resolver| resolver.property() == property)
    }

    pub fn properties(&self) -> Vec<&str> {
        self.resolvers.iter().map(|resolver| resolver.property()).collect()
    }
}

/// Output of a generation pass, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct GeneratedResolvers {
    types: BTreeMap<String, TypeResolvers>,
}

impl GeneratedResolvers {
    pub fn get(&self, type_name: &str) -> Option<&TypeResolvers> {
        self.types.get(type_name)
    }

    pub fn remove(&mut self, type_name: &str) -> Option<TypeResolvers> {
        self.types.remove(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeResolvers> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Assembly-time owner of navigation declarations and resolver registrations.
///
/// ```
/// use graphql_navigation::navigation::{NavigationDeclaration, ResolverRegistration};
/// use graphql_navigation::resolver::NavigationBuilder;
///
/// let mut builder = NavigationBuilder::new();
/// builder
///     .navigation(NavigationDeclaration::one_to_many("User", "roles", "UserRole"))
///     .unwrap()
///     .root_field("allUsers", "User")
///     .resolver(ResolverRegistration::new("User", "accounts"));
///
/// let generated = builder.generate("accounts");
/// assert_eq!(generated.get("User").unwrap().properties(), vec!["roles"]);
/// ```
#[derive(Debug)]
pub struct NavigationBuilder {
    registry: NavigationRegistry,
    groups: ResolverGroups,
    schema: SchemaIndex,
    root_type: String,
}

impl Default for NavigationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationBuilder {
    pub fn new() -> Self {
        Self {
            registry: NavigationRegistry::new(),
            groups: ResolverGroups::new(),
            schema: SchemaIndex::new(),
            root_type: "Query".to_string(),
        }
    }

    /// Name of the operation root type, used as the first path segment.
    pub fn root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = root_type.into();
        self
    }

    pub fn navigation(
        &mut self,
        declaration: NavigationDeclaration,
    ) -> Result<&mut Self, NavigationError> {
        let links = self.registry.register_navigation(declaration)?;
        self.schema.add_links(&links);
        Ok(self)
    }

    /// Record the type a root query field yields.
    pub fn root_field(
        &mut self,
        field: impl Into<String>,
        type_name: impl Into<String>,
    ) -> &mut Self {
        self.schema.add_root_field(field, type_name);
        self
    }

    pub fn resolver(&mut self, registration: ResolverRegistration) -> &mut Self {
        self.groups.register_resolver(registration);
        self
    }

    pub fn registry(&self) -> &NavigationRegistry {
        &self.registry
    }

    pub fn groups(&self) -> &ResolverGroups {
        &self.groups
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    pub fn generate(&mut self, group: &str) -> GeneratedResolvers {
        self.generate_with(group, GenerateOptions::default())
    }

    pub fn generate_with(&mut self, group: &str, options: GenerateOptions) -> GeneratedResolvers {
        let mut generated = GeneratedResolvers::default();

        for registration in self.groups.registrations_of(group) {
            let mut links = self.registry.navigation_maps_of(&registration.target);
            if links.is_empty() {
                warn!(
                    group = %group,
                    target = %registration.target,
                    "Resolver registration has no navigations, skipping"
                );
                continue;
            }

            if let Some(table) = &registration.table_name {
                for link in &mut links {
                    link.source_table = table.clone();
                }
                self.schema.set_table_name(&registration.target, table);
            }

            let resolvers: Vec<Arc<NavigationResolver>> = links
                .into_iter()
                .map(|link| {
                    Arc::new(
                        NavigationResolver::new(link, self.schema.clone())
                            .primary_key(registration.primary_key.clone())
                            .root_type(self.root_type.clone())
                            .before_resolve(registration.before_resolve.clone())
                            .after_resolve(registration.after_resolve.clone()),
                    )
                })
                .collect();

            if !registration.keep_navigation_map {
                self.registry.remove_navigation_maps_of(&registration.target);
            }

            generated
                .types
                .entry(registration.target.clone())
                .or_insert_with(|| TypeResolvers {
                    type_name: registration.target.clone(),
                    resolvers: Vec::new(),
                })
                .resolvers
                .extend(resolvers);
        }

        if !options.keep_registrations {
            self.groups.remove_registrations_of(group);
        }

        info!(
            group = %group,
            types = generated.len(),
            "Generated navigation resolvers"
        );

        generated
    }
}
