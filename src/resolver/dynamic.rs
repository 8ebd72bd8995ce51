//! Dynamic schema glue
//!
//! Records travel through the schema as owned [ResolvedRecord] values that
//! remember the field names leading to them, so aliases never reach path
//! resolution. Scalar fields read from them and navigation fields hand them to
//! their resolver. The [StorageHandle] and an optional [RequestContext] are
//! taken from schema or request data.

use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use serde_json::Value;

use crate::error::StorageError;
use crate::selection::{NestedSelection, SelectionExtractor};
use crate::storage::{FindQuery, Record, StorageHandle};

use super::factory::TypeResolvers;
use super::handler::{FieldRequest, NavigationResolver};
use super::hooks::RequestContext;

/// A record used as a parent value.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub record: Record,
    /// Field names from the root field down to the one that yielded the record.
    pub path: Arc<[String]>,
}

impl ResolvedRecord {
    pub fn new(record: Record, path: Arc<[String]>) -> Self {
        Self { record, path }
    }

    fn child_path(&self, field: &str) -> Arc<[String]> {
        self.path.iter().cloned().chain([field.to_string()]).collect()
    }
}

impl TypeResolvers {
    /// Add one field per navigation to `object`.
    pub fn extend(&self, object: Object) -> Object {
        self.resolvers.iter().fold(object, |object, resolver| {
            object.field(navigation_field(resolver.clone()))
        })
    }
}

/// Field backed by a navigation resolver.
pub fn navigation_field(resolver: Arc<NavigationResolver>) -> Field {
    let link = resolver.link();
    let ty = if link.is_list() {
        TypeRef::named_nn_list_nn(&link.target)
    } else {
        TypeRef::named(&link.target)
    };
    let name = link.source_property.clone();

    Field::new(name, ty, move |ctx| {
        let resolver = resolver.clone();
        FieldFuture::new(async move {
            let parent = ctx.parent_value.try_downcast_ref::<ResolvedRecord>()?;
            let storage = ctx.data::<StorageHandle>()?;
            let context = ctx.data_opt::<RequestContext>().cloned();
            let request = FieldRequest::from_context(&ctx).below(&parent.path);

            let value = resolver
                .resolve(&parent.record, &request, storage.as_ref(), context)
                .await?;
            Ok(to_field_value(value, &Arc::from(request.path)))
        })
    })
}

/// Field reading `name` from the parent record.
pub fn record_field(name: impl Into<String>, ty: impl Into<TypeRef>) -> Field {
    let name = name.into();
    let key = name.clone();

    Field::new(name, ty, move |ctx| {
        let key = key.clone();
        FieldFuture::new(async move {
            let parent = ctx.parent_value.try_downcast_ref::<ResolvedRecord>()?;
            let Some(value) = parent.record.get(&key).cloned() else {
                return Ok(None);
            };
            let path = match value {
                Value::Object(_) | Value::Array(_) => parent.child_path(&key),
                _ => parent.path.clone(),
            };
            Ok(to_field_value(value, &path))
        })
    })
}

/// Root field listing every record of `model` as `type_name`.
///
/// Only scalar columns are selected; navigations below it go through their
/// own resolvers.
pub fn collection_field(
    name: impl Into<String>,
    model: impl Into<String>,
    type_name: &str,
) -> Field {
    let name = name.into();
    let model = model.into();
    let path: Arc<[String]> = Arc::from([name.clone()]);

    Field::new(name, TypeRef::named_nn_list_nn(type_name), move |ctx| {
        let model = model.clone();
        let path = path.clone();
        FieldFuture::new(async move {
            let storage = ctx.data::<StorageHandle>()?;
            let accessor = storage
                .accessor(&model)
                .ok_or_else(|| StorageError::UnknownModel(model.clone()))?;

            let select = {
                let fields: Vec<_> = ctx.field().selection_set().collect();
                let skip = |_: &[String], _: &str| NestedSelection::Skip;
                SelectionExtractor::new().nested(&skip).extract(&fields)
            };

            let records = accessor.find_many(FindQuery::new(select)).await?;
            Ok(Some(FieldValue::list(records.into_iter().map(|record| {
                FieldValue::owned_any(ResolvedRecord::new(record, path.clone()))
            }))))
        })
    })
}

/// Convert a resolved JSON value into a field value.
///
/// Objects become records reached through `path` so nested fields can read
/// them; `null` resolves to no value.
pub fn to_field_value<'a>(value: Value, path: &Arc<[String]>) -> Option<FieldValue<'a>> {
    match value {
        Value::Null => None,
        Value::Object(record) => Some(FieldValue::owned_any(ResolvedRecord::new(
            record,
            path.clone(),
        ))),
        Value::Array(items) => Some(FieldValue::list(
            items
                .into_iter()
                .map(|item| to_field_value(item, path).unwrap_or(FieldValue::NULL)),
        )),
        scalar => Some(FieldValue::value(
            async_graphql::Value::from_json(scalar).unwrap_or_default(),
        )),
    }
}
