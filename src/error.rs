//! Error types for navigation registration, resolution and storage access.

/// Errors raised while registering or resolving a navigation.
///
/// None of these are retried. They point at a misconfigured declaration or a
/// field queried outside of any declared navigation.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// A many-to-many declaration needs the target-side property to build
    /// its reverse link.
    #[error("many-to-many navigation `{model}.{property}` is missing its target property")]
    MissingReverseProperty { model: String, property: String },

    /// The resolve path is too short to reach the field through a navigation.
    #[error("navigation `{model}.{property}` could not be resolved from path `{path}`")]
    UnderResolvedPath {
        model: String,
        property: String,
        path: String,
    },

    /// A path segment does not match any registered navigation.
    #[error("unresolved navigation segment `{segment}` in path `{path}`")]
    UnresolvedSegment { segment: String, path: String },

    /// The storage client has no accessor for the segment's model.
    #[error("no storage accessor for model `{model}` (segment `{segment}`)")]
    MissingAccessor { model: String, segment: String },

    /// The parent record carries no value for the configured primary key.
    #[error("parent `{model}` has no `{key}` value to filter `{property}` on")]
    MissingPrimaryKey {
        model: String,
        key: String,
        property: String,
    },

    /// A list navigation was pre-loaded with something other than a list.
    #[error("pre-loaded `{model}.{property}` is not a list")]
    EagerShapeMismatch { model: String, property: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    #[error("unknown column `{column}` on model `{model}`")]
    UnknownColumn { model: String, column: String },

    #[error("unknown relation `{relation}` on model `{model}`")]
    UnknownRelation { model: String, relation: String },

    #[error("value cannot be bound as a query parameter: {0}")]
    UnsupportedValue(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
