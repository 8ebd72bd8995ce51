//! Navigation declarations and the registries that hold them.

mod groups;
mod link;
mod registry;
mod schema;

pub use groups::{DEFAULT_PRIMARY_KEY, ResolverGroups, ResolverRegistration};
pub use link::{Cardinality, NavigationDeclaration, NavigationLink};
pub use registry::NavigationRegistry;
pub use schema::SchemaIndex;
