//! Field resolution for one navigation link.
//!
//! A resolver tries, in order: the pre-resolve hook, a value already loaded
//! on the parent, and finally a storage query filtered on the relation
//! pointing back at the parent. The post-resolve hook sees whichever value
//! won and may replace it.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::NavigationError;
use crate::navigation::{DEFAULT_PRIMARY_KEY, NavigationLink, SchemaIndex};
use crate::selection::{
    FieldRename, NestedSelection, RequestedField, SelectTree, SelectionExtractor, display_path,
    extract_path, resolve_segments,
};
use crate::storage::{FindQuery, Record, RelationFilter, StorageClient};

use super::hooks::{
    AfterResolve, AfterResolveHook, BeforeResolve, BeforeResolveHook, RequestContext,
};

/// What a resolver needs to know about the field being resolved.
///
/// Captured from the GraphQL context before the first await so the resolver
/// owns everything it reads afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRequest {
    /// Field names along the resolve path, root field first, list indexes
    /// removed.
    pub path: Vec<String>,
    /// Sub-selection of the field.
    pub selection: Vec<RequestedField>,
}

impl FieldRequest {
    pub fn new<I, S>(path: I, selection: Vec<RequestedField>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            selection,
        }
    }

    /// Capture the current field.
    ///
    /// The resolve path only carries response keys, so the last segment is
    /// replaced by the field name. Aliased ancestors stay as written; use
    /// [FieldRequest::below] when the ancestor field names are known.
    pub fn from_context(ctx: &async_graphql::Context<'_>) -> Self {
        let field = ctx.field();
        let mut path = ctx
            .path_node
            .as_ref()
            .map(|node| extract_path(node, &FieldRename::Identity))
            .unwrap_or_default();
        if let Some(last) = path.last_mut() {
            *last = field.name().to_string();
        }
        let selection = field
            .selection_set()
            .map(|child| RequestedField::capture(&child))
            .collect();
        Self { path, selection }
    }

    /// Replace everything above the field itself with `ancestors`.
    pub fn below(mut self, ancestors: &[String]) -> Self {
        let own = self.path.pop();
        self.path = ancestors.iter().cloned().chain(own).collect();
        self
    }
}

/// Resolver generated for one navigation link.
#[derive(Debug, Clone)]
pub struct NavigationResolver {
    link: NavigationLink,
    schema: SchemaIndex,
    rename: Arc<FieldRename>,
    primary_key: String,
    root_type: String,
    before_resolve: Option<BeforeResolveHook>,
    after_resolve: Option<AfterResolveHook>,
}

impl NavigationResolver {
    /// Requested fields are renamed to the storage relations declared by the
    /// types that own them, starting at the link target.
    pub fn new(link: NavigationLink, schema: SchemaIndex) -> Self {
        let rename = FieldRename::relations(schema.clone(), link.target.clone());
        Self {
            link,
            schema,
            rename: Arc::new(rename),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            root_type: "Query".to_string(),
            before_resolve: None,
            after_resolve: None,
        }
    }

    pub fn rename(mut self, rename: Arc<FieldRename>) -> Self {
        self.rename = rename;
        self
    }

    /// Primary key of the parent (source) type.
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = root_type.into();
        self
    }

    pub fn before_resolve(mut self, hook: Option<BeforeResolveHook>) -> Self {
        self.before_resolve = hook;
        self
    }

    pub fn after_resolve(mut self, hook: Option<AfterResolveHook>) -> Self {
        self.after_resolve = hook;
        self
    }

    pub fn link(&self) -> &NavigationLink {
        &self.link
    }

    /// GraphQL field name this resolver answers.
    pub fn property(&self) -> &str {
        &self.link.source_property
    }

    /// Storage model queried for the target, honouring a registered override.
    pub fn target_table(&self) -> String {
        self.schema
            .table_name_of(&self.link.target)
            .unwrap_or_else(|| self.link.target_table.clone())
    }

    pub async fn resolve(
        &self,
        parent: &Record,
        request: &FieldRequest,
        storage: &dyn StorageClient,
        context: Option<RequestContext>,
    ) -> Result<Value, NavigationError> {
        let short_circuit = match &self.before_resolve {
            Some(hook) => hook
                .call(BeforeResolve {
                    parent: parent.clone(),
                    property: self.property().to_string(),
                    path: request.path.clone(),
                    context: context.clone(),
                })
                .await?
                .filter(|value| !value.is_null()),
            None => None,
        };

        let (data, from_storage) = if let Some(value) = short_circuit {
            debug!(
                model = %self.link.source,
                property = %self.property(),
                "Navigation resolved by pre-resolve hook"
            );
            (value, false)
        } else if let Some(value) = self.preloaded(parent)? {
            debug!(
                model = %self.link.source,
                property = %self.property(),
                "Navigation resolved from pre-loaded parent"
            );
            (value, false)
        } else {
            (self.query(parent, request, storage).await?, true)
        };

        let Some(hook) = &self.after_resolve else {
            return Ok(data);
        };
        let replacement = hook
            .call(AfterResolve {
                data: data.clone(),
                parent: parent.clone(),
                property: self.property().to_string(),
                path: request.path.clone(),
                context,
                from_storage,
            })
            .await?;

        Ok(replacement.filter(|value| !value.is_null()).unwrap_or(data))
    }

    /// The navigated value when the parent already carries it.
    ///
    /// A `null` counts as not loaded. List items that wrap the target under
    /// its table name (junction rows) are unwrapped.
    fn preloaded(&self, parent: &Record) -> Result<Option<Value>, NavigationError> {
        let loaded = parent
            .get(&self.link.source_property)
            .or_else(|| parent.get(&self.link.source_relation))
            .filter(|value| !value.is_null());
        let Some(loaded) = loaded else {
            return Ok(None);
        };

        if !self.link.is_list() {
            return Ok(Some(loaded.clone()));
        }

        let Value::Array(items) = loaded else {
            return Err(NavigationError::EagerShapeMismatch {
                model: self.link.source.clone(),
                property: self.link.source_property.clone(),
            });
        };

        let table = self.target_table();
        let items = items
            .iter()
            .map(|item| {
                item.as_object()
                    .and_then(|row| row.get(&table))
                    .unwrap_or(item)
                    .clone()
            })
            .collect();
        Ok(Some(Value::Array(items)))
    }

    async fn query(
        &self,
        parent: &Record,
        request: &FieldRequest,
        storage: &dyn StorageClient,
    ) -> Result<Value, NavigationError> {
        let link = &self.link;
        let path = display_path(&request.path);
        let segments = resolve_segments(&request.path, &self.schema, &self.root_type);

        // Operation root, root field, then at least the field itself.
        let Some((last, intermediate)) = segments.get(2..).and_then(|rest| rest.split_last())
        else {
            return Err(NavigationError::UnderResolvedPath {
                model: link.source.clone(),
                property: link.source_property.clone(),
                path,
            });
        };
        if let Some(segment) = intermediate.iter().find(|segment| !segment.is_resolved()) {
            return Err(NavigationError::UnresolvedSegment {
                segment: segment.property.clone(),
                path,
            });
        }
        let own_link = last.links.iter().any(|candidate| {
            candidate.source == link.source && candidate.source_property == link.source_property
        });
        if !own_link {
            return Err(NavigationError::UnresolvedSegment {
                segment: last.property.clone(),
                path,
            });
        }

        let table = last.table_name.clone().unwrap_or_else(|| self.target_table());
        let accessor = storage
            .accessor(&table)
            .ok_or_else(|| NavigationError::MissingAccessor {
                model: table.clone(),
                segment: last.property.clone(),
            })?;

        let key = parent
            .get(&self.primary_key)
            .filter(|value| !value.is_null())
            .ok_or_else(|| NavigationError::MissingPrimaryKey {
                model: link.source.clone(),
                key: self.primary_key.clone(),
                property: link.source_property.clone(),
            })?;

        let query = FindQuery::new(self.select_tree(&request.selection)).filter(RelationFilter {
            relation: link.reverse_table.clone(),
            field: self.primary_key.clone(),
            value: key.clone(),
            many: link.reverse_is_list(),
        });

        debug!(
            model = %table,
            relation = %link.reverse_table,
            path = %path,
            select = %query.select.to_json(),
            "Resolving navigation from storage"
        );

        if link.is_list() {
            let records = accessor.find_many(query).await?;
            Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
        } else {
            let record = accessor.find_first(query).await?;
            Ok(record.map(Value::Object).unwrap_or(Value::Null))
        }
    }

    /// Storage selection for the requested sub-fields.
    ///
    /// List navigations of the target type are included whole; their own
    /// resolvers pick them up from the loaded record. Relation names come
    /// from the resolver's rename.
    fn select_tree(&self, selection: &[RequestedField]) -> SelectTree {
        let lists = self.schema.list_properties_of(&self.link.target);
        let policy = move |ancestors: &[String], field: &str| {
            if ancestors.is_empty() && lists.contains(field) {
                NestedSelection::Include
            } else {
                NestedSelection::Recurse
            }
        };
        let fields: Vec<&RequestedField> = selection.iter().collect();

        SelectionExtractor::new()
            .rename(&self.rename)
            .nested(&policy)
            .extract(&fields)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::error::StorageError;
    use crate::navigation::NavigationDeclaration;
    use crate::storage::ModelAccessor;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        model: String,
        method: &'static str,
        query: FindQuery,
    }

    #[derive(Default, Clone)]
    struct RecordingStorage {
        calls: Arc<Mutex<Vec<Call>>>,
        rows: Vec<Record>,
    }

    impl RecordingStorage {
        fn returning(rows: Value) -> Self {
            let rows = match rows {
                Value::Array(rows) => rows
                    .into_iter()
                    .filter_map(|row| row.as_object().cloned())
                    .collect(),
                _ => Vec::new(),
            };
            Self {
                rows,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    struct RecordingAccessor {
        model: String,
        storage: RecordingStorage,
    }

    #[async_trait]
    impl ModelAccessor for RecordingAccessor {
        async fn find_many(&self, query: FindQuery) -> Result<Vec<Record>, StorageError> {
            self.storage.calls.lock().push(Call {
                model: self.model.clone(),
                method: "find_many",
                query,
            });
            Ok(self.storage.rows.clone())
        }

        async fn find_first(&self, query: FindQuery) -> Result<Option<Record>, StorageError> {
            self.storage.calls.lock().push(Call {
                model: self.model.clone(),
                method: "find_first",
                query,
            });
            Ok(self.storage.rows.first().cloned())
        }
    }

    impl StorageClient for RecordingStorage {
        fn accessor(&self, model: &str) -> Option<Arc<dyn ModelAccessor>> {
            if !["user", "userRole", "userClaim", "account"].contains(&model) {
                return None;
            }
            Some(Arc::new(RecordingAccessor {
                model: model.to_string(),
                storage: self.clone(),
            }))
        }
    }

    fn schema() -> SchemaIndex {
        let schema = SchemaIndex::new();
        for declaration in [
            NavigationDeclaration::one_to_many("User", "roles", "UserRole"),
            NavigationDeclaration::many_to_many("UserRole", "claims", "UserClaim", "roles"),
            NavigationDeclaration::many_to_one("UserRole", "user", "User").reverse_table("roles"),
        ] {
            schema.add_links(&declaration.into_links().unwrap());
        }
        schema.add_root_field("allUsers", "User");
        schema
    }

    fn resolver(schema: &SchemaIndex, source: &str, property: &str) -> NavigationResolver {
        let link = schema
            .links_by_property(property, Some(source))
            .into_iter()
            .next()
            .unwrap();
        NavigationResolver::new(link, schema.clone())
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_roles_query_filters_on_parent_key() {
        let schema = schema();
        let storage = RecordingStorage::returning(json!([{ "id": 10, "name": "admin" }]));
        let request = FieldRequest::new(
            ["allUsers", "roles"],
            vec![RequestedField::leaf("id"), RequestedField::leaf("name")],
        );

        let value = resolver(&schema, "User", "roles")
            .resolve(&record(json!({ "id": 1 })), &request, &storage, None)
            .await
            .unwrap();

        assert_eq!(value, json!([{ "id": 10, "name": "admin" }]));
        assert_eq!(
            storage.calls(),
            vec![Call {
                model: "userRole".to_string(),
                method: "find_many",
                query: FindQuery::new(SelectTree::new().scalar("id").scalar("name")).filter(
                    RelationFilter {
                        relation: "user".to_string(),
                        field: "id".to_string(),
                        value: json!(1),
                        many: false,
                    }
                ),
            }]
        );
        assert_eq!(
            storage.calls()[0].query.select.to_json(),
            json!({ "id": true, "name": true })
        );
    }

    #[tokio::test]
    async fn test_many_to_many_halves_resolve_independently() {
        let schema = schema();
        let storage = RecordingStorage::returning(json!([]));

        let claims = FieldRequest::new(
            ["allUsers", "roles", "claims"],
            vec![RequestedField::leaf("id")],
        );
        resolver(&schema, "UserRole", "claims")
            .resolve(&record(json!({ "id": 10 })), &claims, &storage, None)
            .await
            .unwrap();

        schema.add_root_field("allClaims", "UserClaim");
        let roles = FieldRequest::new(["allClaims", "roles"], vec![RequestedField::leaf("name")]);
        resolver(&schema, "UserClaim", "roles")
            .resolve(&record(json!({ "id": 7 })), &roles, &storage, None)
            .await
            .unwrap();

        let calls = storage.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].model, "userClaim");
        assert_eq!(
            calls[0].query.filter,
            Some(RelationFilter {
                relation: "roles".to_string(),
                field: "id".to_string(),
                value: json!(10),
                many: true,
            })
        );
        assert_eq!(calls[1].model, "userRole");
        assert_eq!(
            calls[1].query.filter.as_ref().map(|f| f.relation.as_str()),
            Some("claims")
        );
    }

    #[tokio::test]
    async fn test_singular_navigation_uses_find_first() {
        let schema = schema();
        let storage = RecordingStorage::returning(json!([{ "id": 1, "name": "ada" }]));
        let request = FieldRequest::new(
            ["allUsers", "roles", "user"],
            vec![RequestedField::leaf("name")],
        );

        let value = resolver(&schema, "UserRole", "user")
            .resolve(&record(json!({ "id": 10 })), &request, &storage, None)
            .await
            .unwrap();

        assert_eq!(value, json!({ "id": 1, "name": "ada" }));
        let calls = storage.calls();
        assert_eq!(calls[0].method, "find_first");
        assert_eq!(calls[0].model, "user");
        assert_matches!(
            &calls[0].query.filter,
            Some(filter) if filter.relation == "roles" && filter.many
        );
    }

    #[tokio::test]
    async fn test_list_navigations_of_target_are_included() {
        let schema = schema();
        let storage = RecordingStorage::returning(json!([]));
        let request = FieldRequest::new(
            ["allUsers", "roles"],
            vec![
                RequestedField::leaf("id"),
                RequestedField::new("claims", vec![RequestedField::leaf("id")]),
                RequestedField::new("user", vec![RequestedField::leaf("name")]),
            ],
        );

        resolver(&schema, "User", "roles")
            .resolve(&record(json!({ "id": 1 })), &request, &storage, None)
            .await
            .unwrap();

        assert_eq!(
            storage.calls()[0].query.select.to_json(),
            json!({ "id": true, "claims": true, "user": { "select": { "name": true } } })
        );
    }

    #[tokio::test]
    async fn test_nested_fields_use_relations_of_their_own_type() {
        let schema = SchemaIndex::new();
        for declaration in [
            NavigationDeclaration::one_to_many("User", "roles", "UserRole"),
            NavigationDeclaration::many_to_one("UserRole", "owner", "User")
                .source_relation("user")
                .reverse_table("roles"),
        ] {
            schema.add_links(&declaration.into_links().unwrap());
        }
        schema.add_root_field("allUsers", "User");
        let storage = RecordingStorage::returning(json!([]));
        let request = FieldRequest::new(
            ["allUsers", "roles"],
            vec![RequestedField::new(
                "owner",
                vec![
                    RequestedField::leaf("name"),
                    RequestedField::new("roles", vec![RequestedField::leaf("id")]),
                ],
            )],
        );

        resolver(&schema, "User", "roles")
            .resolve(&record(json!({ "id": 1 })), &request, &storage, None)
            .await
            .unwrap();

        assert_eq!(
            storage.calls()[0].query.select.to_json(),
            json!({ "user": { "select": { "name": true, "roles": { "select": { "id": true } } } } })
        );

        let parent = record(json!({ "id": 10, "user": { "name": "ada" } }));
        let request = FieldRequest::new(["allUsers", "roles", "owner"], Vec::new());
        let value = resolver(&schema, "UserRole", "owner")
            .resolve(&parent, &request, &storage, None)
            .await
            .unwrap();
        assert_eq!(value, json!({ "name": "ada" }));
    }

    #[tokio::test]
    async fn test_table_name_override_selects_accessor() {
        let schema = schema();
        schema.set_table_name("User", "account");
        let storage = RecordingStorage::returning(json!([{ "id": 1 }]));
        let request = FieldRequest::new(
            ["allUsers", "roles", "user"],
            vec![RequestedField::leaf("id")],
        );

        let resolver = resolver(&schema, "UserRole", "user");
        assert_eq!(resolver.target_table(), "account");
        resolver
            .resolve(&record(json!({ "id": 10 })), &request, &storage, None)
            .await
            .unwrap();

        assert_eq!(storage.calls()[0].model, "account");

        schema.set_table_name("User", "definitely_not_a_table");
        let result = resolver
            .resolve(&record(json!({ "id": 10 })), &request, &storage, None)
            .await;
        assert_matches!(
            result,
            Err(NavigationError::MissingAccessor { model, .. }) if model == "definitely_not_a_table"
        );
    }

    #[test]
    fn test_request_below_known_ancestors() {
        let request = FieldRequest::new(["allUsers", "myRoles", "claims"], Vec::new())
            .below(&["allUsers".to_string(), "roles".to_string()]);
        assert_eq!(request.path, vec!["allUsers", "roles", "claims"]);

        let request = FieldRequest::new(["allUsers"], Vec::new()).below(&[]);
        assert_eq!(request.path, vec!["allUsers"]);
    }

    #[tokio::test]
    async fn test_before_hook_short_circuits_and_after_hook_overrides() {
        let schema = schema();
        let storage = RecordingStorage::returning(json!([]));
        let seen = Arc::new(Mutex::new(None));
        let seen_by_hook = seen.clone();

        let resolver = resolver(&schema, "User", "roles")
            .before_resolve(Some(BeforeResolveHook::new(|_| async {
                Ok(Some(json!([{ "id": "cached" }])))
            })))
            .after_resolve(Some(AfterResolveHook::new(move |args: AfterResolve| {
                let seen = seen_by_hook.clone();
                async move {
                    *seen.lock() = Some((args.data.clone(), args.from_storage));
                    Ok(Some(json!([{ "id": "overridden" }])))
                }
            })));

        let value = resolver
            .resolve(
                &record(json!({ "id": 1 })),
                &FieldRequest::new(["allUsers", "roles"], Vec::new()),
                &storage,
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, json!([{ "id": "overridden" }]));
        assert!(storage.calls().is_empty());
        assert_eq!(*seen.lock(), Some((json!([{ "id": "cached" }]), false)));
    }

    #[tokio::test]
    async fn test_hooks_receive_request_context() {
        let schema = schema();
        let storage = RecordingStorage::returning(json!([]));
        let resolver = resolver(&schema, "User", "roles").after_resolve(Some(AfterResolveHook::new(
            |args: AfterResolve| async move {
                assert!(args.from_storage);
                Ok(args.context.and_then(|ctx| ctx.get("tenant").cloned()))
            },
        )));

        let mut values = serde_json::Map::new();
        values.insert("tenant".to_string(), json!("acme"));
        let value = resolver
            .resolve(
                &record(json!({ "id": 1 })),
                &FieldRequest::new(["allUsers", "roles"], Vec::new()),
                &storage,
                Some(RequestContext::new(values)),
            )
            .await
            .unwrap();

        assert_eq!(value, json!("acme"));
    }

    #[tokio::test]
    async fn test_preloaded_values_skip_storage() {
        let schema = schema();
        let storage = RecordingStorage::default();
        let request = FieldRequest::new(["allUsers", "roles", "claims"], Vec::new());

        let parent = record(json!({
            "id": 10,
            "claims": [{ "userClaim": { "id": 1 } }, { "id": 2 }]
        }));
        let value = resolver(&schema, "UserRole", "claims")
            .resolve(&parent, &request, &storage, None)
            .await
            .unwrap();
        assert_eq!(value, json!([{ "id": 1 }, { "id": 2 }]));

        let parent = record(json!({ "id": 10, "user": { "id": 1 } }));
        let request = FieldRequest::new(["allUsers", "roles", "user"], Vec::new());
        let value = resolver(&schema, "UserRole", "user")
            .resolve(&parent, &request, &storage, None)
            .await
            .unwrap();
        assert_eq!(value, json!({ "id": 1 }));

        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_preloaded_list_of_wrong_shape_fails() {
        let schema = schema();
        let parent = record(json!({ "id": 10, "claims": { "id": 1 } }));
        let request = FieldRequest::new(["allUsers", "roles", "claims"], Vec::new());

        let result = resolver(&schema, "UserRole", "claims")
            .resolve(&parent, &request, &RecordingStorage::default(), None)
            .await;

        assert_matches!(
            result,
            Err(NavigationError::EagerShapeMismatch { property, .. }) if property == "claims"
        );
    }

    #[tokio::test]
    async fn test_path_errors() {
        let schema = schema();
        let storage = RecordingStorage::default();
        let parent = record(json!({ "id": 1 }));
        let roles = resolver(&schema, "User", "roles");

        let result = roles
            .resolve(&parent, &FieldRequest::new(["roles"], Vec::new()), &storage, None)
            .await;
        assert_matches!(
            result,
            Err(NavigationError::UnderResolvedPath { path, .. }) if path == "roles"
        );

        let result = roles
            .resolve(
                &parent,
                &FieldRequest::new(["allUsers", "friends", "roles"], Vec::new()),
                &storage,
                None,
            )
            .await;
        assert_matches!(
            result,
            Err(NavigationError::UnresolvedSegment { segment, .. }) if segment == "friends"
        );

        let result = roles
            .resolve(
                &record(json!({ "name": "ada" })),
                &FieldRequest::new(["allUsers", "roles"], Vec::new()),
                &storage,
                None,
            )
            .await;
        assert_matches!(result, Err(NavigationError::MissingPrimaryKey { key, .. }) if key == "id");
    }

    #[tokio::test]
    async fn test_missing_accessor() {
        let schema = SchemaIndex::new();
        schema.add_links(
            &NavigationDeclaration::one_to_many("User", "posts", "Post")
                .into_links()
                .unwrap(),
        );
        schema.add_root_field("allUsers", "User");

        let result = resolver(&schema, "User", "posts")
            .resolve(
                &record(json!({ "id": 1 })),
                &FieldRequest::new(["allUsers", "posts"], Vec::new()),
                &RecordingStorage::default(),
                None,
            )
            .await;

        assert_matches!(
            result,
            Err(NavigationError::MissingAccessor { model, .. }) if model == "post"
        );
    }
}
