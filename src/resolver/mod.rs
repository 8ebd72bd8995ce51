//! Navigation resolvers: generation, per-field resolution, hooks, and their
//! dynamic schema fields.

mod dynamic;
mod factory;
mod handler;
pub mod hooks;

pub use dynamic::{
    ResolvedRecord, collection_field, navigation_field, record_field, to_field_value,
};
pub use factory::{GenerateOptions, GeneratedResolvers, NavigationBuilder, TypeResolvers};
pub use handler::{FieldRequest, NavigationResolver};
pub use hooks::{
    AfterResolve, AfterResolveHook, BeforeResolve, BeforeResolveHook, HookFuture, RequestContext,
};
