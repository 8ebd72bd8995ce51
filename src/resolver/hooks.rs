//! Pre- and post-resolve hooks for generated navigation resolvers.
//!
//! A pre-resolve hook returning `Some` short-circuits storage access; the
//! post-resolve hook still runs and may replace the value again.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::storage::Record;

/// Per-request values made available to hooks.
///
/// Insert one into the GraphQL request data (`Request::data`) to have it
/// passed along; resolvers run without one otherwise.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Arc<Map<String, Value>>,
}

impl RequestContext {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Arguments passed to a pre-resolve hook.
#[derive(Debug, Clone)]
pub struct BeforeResolve {
    pub parent: Record,
    pub property: String,
    /// Resolve path, root to leaf, without list indexes.
    pub path: Vec<String>,
    pub context: Option<RequestContext>,
}

/// Arguments passed to a post-resolve hook.
#[derive(Debug, Clone)]
pub struct AfterResolve {
    pub data: Value,
    pub parent: Record,
    pub property: String,
    pub path: Vec<String>,
    pub context: Option<RequestContext>,
    /// Whether `data` came from a storage query (as opposed to a pre-resolve
    /// hook or a pre-loaded parent property).
    pub from_storage: bool,
}

pub type HookFuture = BoxFuture<'static, anyhow::Result<Option<Value>>>;

#[derive(Clone)]
pub struct BeforeResolveHook(Arc<dyn Fn(BeforeResolve) -> HookFuture + Send + Sync>);

impl BeforeResolveHook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(BeforeResolve) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self(Arc::new(move |args: BeforeResolve| -> HookFuture { Box::pin(hook(args)) }))
    }

    pub async fn call(&self, args: BeforeResolve) -> anyhow::Result<Option<Value>> {
        (self.0)(args).await
    }
}

impl std::fmt::Debug for BeforeResolveHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BeforeResolveHook")
    }
}

#[derive(Clone)]
pub struct AfterResolveHook(Arc<dyn Fn(AfterResolve) -> HookFuture + Send + Sync>);

impl AfterResolveHook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(AfterResolve) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self(Arc::new(move |args: AfterResolve| -> HookFuture { Box::pin(hook(args)) }))
    }

    pub async fn call(&self, args: AfterResolve) -> anyhow::Result<Option<Value>> {
        (self.0)(args).await
    }
}

impl std::fmt::Debug for AfterResolveHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AfterResolveHook")
    }
}
