//! Resolver group registrations
//!
//! A registration asks for navigation resolvers to be generated for one type
//! when its group is generated.

use crate::resolver::hooks::{AfterResolveHook, BeforeResolveHook};

pub const DEFAULT_PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone)]
pub struct ResolverRegistration {
    pub target: String,
    pub group: String,
    /// Storage model name overriding the declared source table of the type's links.
    pub table_name: Option<String>,
    pub primary_key: String,
    pub before_resolve: Option<BeforeResolveHook>,
    pub after_resolve: Option<AfterResolveHook>,
    /// Keep the type's links in the registry after generation.
    pub keep_navigation_map: bool,
}

impl ResolverRegistration {
    pub fn new(target: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            group: group.into(),
            table_name: None,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            before_resolve: None,
            after_resolve: None,
            keep_navigation_map: false,
        }
    }

    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn before_resolve(mut self, hook: BeforeResolveHook) -> Self {
        self.before_resolve = Some(hook);
        self
    }

    pub fn after_resolve(mut self, hook: AfterResolveHook) -> Self {
        self.after_resolve = Some(hook);
        self
    }

    pub fn keep_navigation_map(mut self, keep: bool) -> Self {
        self.keep_navigation_map = keep;
        self
    }
}

#[derive(Debug, Default)]
pub struct ResolverGroups {
    registrations: Vec<ResolverRegistration>,
}

impl ResolverGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resolver(&mut self, registration: ResolverRegistration) {
        self.registrations.push(registration);
    }

    /// Registrations of `group`, in registration order.
    pub fn registrations_of(&self, group: &str) -> Vec<ResolverRegistration> {
        self.registrations
            .iter()
            .filter(|r| r.group == group)
            .cloned()
            .collect()
    }

    /// Remove the registrations of `group`, returning how many were removed.
    pub fn remove_registrations_of(&mut self, group: &str) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.group != group);
        before - self.registrations.len()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_defaults() {
        let registration = ResolverRegistration::new("User", "accounts");

        assert_eq!(registration.primary_key, "id");
        assert!(registration.table_name.is_none());
        assert!(!registration.keep_navigation_map);
    }

    #[test]
    fn test_groups_are_independent() {
        let mut groups = ResolverGroups::new();
        groups.register_resolver(ResolverRegistration::new("User", "accounts"));
        groups.register_resolver(ResolverRegistration::new("UserRole", "accounts"));
        groups.register_resolver(ResolverRegistration::new("Invoice", "billing"));

        assert_eq!(groups.registrations_of("accounts").len(), 2);
        assert_eq!(groups.remove_registrations_of("accounts"), 2);
        assert_eq!(groups.remove_registrations_of("accounts"), 0);
        assert_eq!(groups.registrations_of("billing")[0].target, "Invoice");
        assert_eq!(groups.len(), 1);
    }
}
