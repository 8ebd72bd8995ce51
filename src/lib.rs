//! GraphQL navigation resolvers
//!
//! Declared links between model types become generated field resolvers that
//! fetch the related records from storage, selecting only what the query
//! asked for.
//!
//! ```no_run
//! use graphql_navigation::navigation::{NavigationDeclaration, ResolverRegistration};
//! use graphql_navigation::resolver::NavigationBuilder;
//!
//! let mut builder = NavigationBuilder::new();
//! builder
//!     .navigation(NavigationDeclaration::many_to_many("UserRole", "claims", "UserClaim", "roles"))
//!     .unwrap()
//!     .root_field("allClaims", "UserClaim")
//!     .resolver(ResolverRegistration::new("UserClaim", "accounts"));
//!
//! let generated = builder.generate("accounts");
//! let claim = async_graphql::dynamic::Object::new("UserClaim");
//! let claim = generated.get("UserClaim").unwrap().extend(claim);
//! ```

pub mod config;
#[cfg(feature = "sqlite")]
pub mod demo;
pub mod error;
pub mod naming;
pub mod navigation;
pub mod resolver;
pub mod selection;
pub mod storage;

pub use error::{NavigationError, StorageError};
