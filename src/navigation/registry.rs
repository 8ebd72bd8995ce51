//! Navigation registry
//!
//! Holds the links declared during assembly until a generation pass consumes
//! them. The backing store is dropped once the last link is removed, so
//! [NavigationRegistry::remove_navigation_maps_of] can report whether there
//! was anything registered at all.

use crate::error::NavigationError;

use super::link::{NavigationDeclaration, NavigationLink};

#[derive(Debug, Default)]
pub struct NavigationRegistry {
    links: Option<Vec<NavigationLink>>,
}

impl NavigationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration, returning the links it expanded into.
    ///
    /// A many-to-many declaration appends two complementary links.
    pub fn register_navigation(
        &mut self,
        declaration: NavigationDeclaration,
    ) -> Result<Vec<NavigationLink>, NavigationError> {
        let links = declaration.into_links()?;
        self.links
            .get_or_insert_with(Vec::new)
            .extend(links.iter().cloned());
        Ok(links)
    }

    /// All links whose source is `type_name`, in registration order.
    pub fn navigation_maps_of(&self, type_name: &str) -> Vec<NavigationLink> {
        self.links
            .iter()
            .flatten()
            .filter(|link| link.source == type_name)
            .cloned()
            .collect()
    }

    /// Remove every link whose source is `type_name`.
    ///
    /// Returns whether the registry held any links before the call.
    pub fn remove_navigation_maps_of(&mut self, type_name: &str) -> bool {
        let Some(links) = self.links.as_mut() else {
            return false;
        };

        links.retain(|link| link.source != type_name);
        if links.is_empty() {
            self.links = None;
        }
        true
    }

    /// Shallow copy of the whole registry.
    pub fn navigation_maps(&self) -> Vec<NavigationLink> {
        self.links.clone().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_none()
    }
}
