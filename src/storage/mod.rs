//! Storage capability consumed by generated resolvers
//!
//! A [StorageClient] hands out a [ModelAccessor] per canonical (lower camel
//! case) model name. Accessors answer `find_many` / `find_first` for a
//! [FindQuery] and return records shaped by its select tree.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::selection::SelectTree;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteModel, SqliteRelation, SqliteStorage};

/// A stored record as a JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Records whose `relation` points at a record whose `field` equals `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    pub relation: String,
    pub field: String,
    pub value: Value,
    /// The relation is a list (match if any related record matches).
    pub many: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub select: SelectTree,
    pub filter: Option<RelationFilter>,
}

impl FindQuery {
    pub fn new(select: SelectTree) -> Self {
        Self {
            select,
            filter: None,
        }
    }

    pub fn filter(mut self, filter: RelationFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Query capability for one model.
#[async_trait]
pub trait ModelAccessor: Send + Sync {
    async fn find_many(&self, query: FindQuery) -> Result<Vec<Record>, StorageError>;

    async fn find_first(&self, query: FindQuery) -> Result<Option<Record>, StorageError>;
}

pub trait StorageClient: Send + Sync {
    /// Accessor for a canonical model name, if the model is known.
    fn accessor(&self, model: &str) -> Option<Arc<dyn ModelAccessor>>;
}

/// Shared storage client, as placed into GraphQL schema data.
pub type StorageHandle = Arc<dyn StorageClient>;
