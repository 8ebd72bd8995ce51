//! SQLite storage backed by sqlx
//!
//! Models map canonical names to tables and declare their relations.
//! Identifiers from a select tree or filter are checked against the model
//! before they are quoted into SQL; values are always bound.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Column, Row, Sqlite};

use crate::error::StorageError;
use crate::selection::{SelectNode, SelectTree};

use super::{FindQuery, ModelAccessor, Record, RelationFilter, StorageClient};

/// How a model relates to another one.
#[derive(Debug, Clone)]
pub enum SqliteRelation {
    /// This model's `foreign_key` column references the other model's key.
    BelongsTo { model: String, foreign_key: String },
    /// The other model's `foreign_key` column references this model's key.
    HasOne { model: String, foreign_key: String },
    HasMany { model: String, foreign_key: String },
    /// Rows of `junction` pair `local_key` (this model) with `foreign_key`
    /// (the other model).
    ManyToMany {
        model: String,
        junction: String,
        local_key: String,
        foreign_key: String,
    },
}

impl SqliteRelation {
    pub fn model(&self) -> &str {
        match self {
            SqliteRelation::BelongsTo { model, .. }
            | SqliteRelation::HasOne { model, .. }
            | SqliteRelation::HasMany { model, .. }
            | SqliteRelation::ManyToMany { model, .. } => model,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            SqliteRelation::HasMany { .. } | SqliteRelation::ManyToMany { .. }
        )
    }
}

/// A model stored in one table.
#[derive(Debug, Clone)]
pub struct SqliteModel {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<String>,
    pub relations: HashMap<String, SqliteRelation>,
}

impl SqliteModel {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            columns: Vec::new(),
            relations: HashMap::new(),
        }
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn relation(mut self, name: impl Into<String>, relation: SqliteRelation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    fn has_column(&self, column: &str) -> bool {
        column == self.primary_key || self.columns.iter().any(|c| c == column)
    }

    fn require_column(&self, column: &str) -> Result<(), StorageError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(StorageError::UnknownColumn {
                model: self.name.clone(),
                column: column.to_string(),
            })
        }
    }

    fn require_relation(&self, relation: &str) -> Result<&SqliteRelation, StorageError> {
        self.relations
            .get(relation)
            .ok_or_else(|| StorageError::UnknownRelation {
                model: self.name.clone(),
                relation: relation.to_string(),
            })
    }

    /// Select tree covering every column.
    fn full_select(&self) -> SelectTree {
        let mut tree = SelectTree::new().scalar(self.primary_key.clone());
        for column in &self.columns {
            tree.insert(column.clone(), SelectNode::Scalar);
        }
        tree
    }
}

/// A value bound to a query parameter.
#[derive(Debug, Clone)]
enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SqlValue {
    fn from_json(value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Bool(b) => Ok(SqlValue::Bool(*b)),
            Value::String(s) => Ok(SqlValue::String(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(SqlValue::Int(i)),
                None => n
                    .as_f64()
                    .map(SqlValue::Float)
                    .ok_or_else(|| StorageError::UnsupportedValue(n.to_string())),
            },
            other => Err(StorageError::UnsupportedValue(other.to_string())),
        }
    }

    fn bind_to_query<'q>(
        &'q self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

/// A WHERE clause fragment using `?` placeholders, with its bound values.
#[derive(Debug, Clone)]
struct Condition {
    sql: String,
    values: Vec<SqlValue>,
}

impl Condition {
    fn new(sql: String, value: SqlValue) -> Self {
        Self {
            sql,
            values: vec![value],
        }
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

struct Catalog {
    pool: SqlitePool,
    models: HashMap<String, SqliteModel>,
}

impl Catalog {
    fn model(&self, name: &str) -> Result<&SqliteModel, StorageError> {
        self.models
            .get(name)
            .ok_or_else(|| StorageError::UnknownModel(name.to_string()))
    }

    /// Translate a relation filter on `model` into a condition.
    fn filter_condition(
        &self,
        model: &SqliteModel,
        filter: &RelationFilter,
    ) -> Result<Condition, StorageError> {
        let relation = model.require_relation(&filter.relation)?;
        let related = self.model(relation.model())?;
        related.require_column(&filter.field)?;
        let value = SqlValue::from_json(&filter.value)?;

        let sql = match relation {
            SqliteRelation::BelongsTo { foreign_key, .. } => format!(
                "{} IN (SELECT {} FROM {} WHERE {} = ?)",
                quote(foreign_key),
                quote(&related.primary_key),
                quote(&related.table),
                quote(&filter.field)
            ),
            SqliteRelation::HasOne { foreign_key, .. }
            | SqliteRelation::HasMany { foreign_key, .. } => format!(
                "{} IN (SELECT {} FROM {} WHERE {} = ?)",
                quote(&model.primary_key),
                quote(foreign_key),
                quote(&related.table),
                quote(&filter.field)
            ),
            SqliteRelation::ManyToMany {
                junction,
                local_key,
                foreign_key,
                ..
            } => format!(
                "{} IN (SELECT j.{} FROM {} AS j JOIN {} AS r ON r.{} = j.{} WHERE r.{} = ?)",
                quote(&model.primary_key),
                quote(local_key),
                quote(junction),
                quote(&related.table),
                quote(&related.primary_key),
                quote(foreign_key),
                quote(&filter.field)
            ),
        };

        Ok(Condition::new(sql, value))
    }

    fn find<'a>(
        &'a self,
        model: &'a SqliteModel,
        condition: Option<Condition>,
        select: &'a SelectTree,
        first_only: bool,
    ) -> BoxFuture<'a, Result<Vec<Record>, StorageError>> {
        Box::pin(async move {
            let mut columns = vec![model.primary_key.clone()];
            let mut hidden = HashSet::new();
            let mut relations = Vec::new();

            for (name, node) in select.iter() {
                match node {
                    SelectNode::Scalar => {
                        model.require_column(name)?;
                        if !columns.contains(name) {
                            columns.push(name.clone());
                        }
                    }
                    SelectNode::Include { relation } | SelectNode::Nested { relation, .. } => {
                        let definition = model.require_relation(relation)?;
                        relations.push((relation, definition, node));
                    }
                }
            }

            // Foreign keys needed to follow belongs-to relations, dropped
            // again unless they were selected.
            for (_, definition, _) in &relations {
                if let SqliteRelation::BelongsTo { foreign_key, .. } = definition {
                    model.require_column(foreign_key)?;
                    if !columns.contains(foreign_key) {
                        columns.push(foreign_key.clone());
                        hidden.insert(foreign_key.clone());
                    }
                }
            }

            let mut sql = format!(
                "SELECT {} FROM {}",
                columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
                quote(&model.table)
            );
            let values = match &condition {
                Some(condition) => {
                    sql.push_str(" WHERE ");
                    sql.push_str(&condition.sql);
                    condition.values.clone()
                }
                None => Vec::new(),
            };
            sql.push_str(&format!(" ORDER BY {}", quote(&model.primary_key)));
            if first_only {
                sql.push_str(" LIMIT 1");
            }

            tracing::debug!(model = %model.name, sql = %sql, "Executing navigation query");

            let mut query = sqlx::query(&sql);
            for value in &values {
                query = value.bind_to_query(query);
            }
            let rows = query.fetch_all(&self.pool).await?;

            let mut records = Vec::with_capacity(rows.len());
            for row in &rows {
                let mut record = row_to_record(row)?;
                for (name, definition, node) in &relations {
                    let loaded = self.load_relation(model, definition, node, &record).await?;
                    record.insert((*name).clone(), loaded);
                }
                for column in &hidden {
                    record.remove(column);
                }
                records.push(record);
            }

            Ok(records)
        })
    }

    /// Load one relation of `record` according to its select node.
    async fn load_relation(
        &self,
        model: &SqliteModel,
        definition: &SqliteRelation,
        node: &SelectNode,
        record: &Record,
    ) -> Result<Value, StorageError> {
        let related = self.model(definition.model())?;
        let full;
        let select = match node {
            SelectNode::Nested { select, .. } => select,
            _ => {
                full = related.full_select();
                &full
            }
        };

        let own_key = || {
            record
                .get(&model.primary_key)
                .map(SqlValue::from_json)
                .transpose()
                .map(|value| value.unwrap_or(SqlValue::Null))
        };

        let (condition, many) = match definition {
            SqliteRelation::BelongsTo { foreign_key, .. } => {
                let value = record.get(foreign_key).cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let sql = format!("{} = ?", quote(&related.primary_key));
                (Condition::new(sql, SqlValue::from_json(&value)?), false)
            }
            SqliteRelation::HasOne { foreign_key, .. } => {
                let sql = format!("{} = ?", quote(foreign_key));
                (Condition::new(sql, own_key()?), false)
            }
            SqliteRelation::HasMany { foreign_key, .. } => {
                let sql = format!("{} = ?", quote(foreign_key));
                (Condition::new(sql, own_key()?), true)
            }
            SqliteRelation::ManyToMany {
                junction,
                local_key,
                foreign_key,
                ..
            } => {
                let sql = format!(
                    "{} IN (SELECT {} FROM {} WHERE {} = ?)",
                    quote(&related.primary_key),
                    quote(foreign_key),
                    quote(junction),
                    quote(local_key)
                );
                (Condition::new(sql, own_key()?), true)
            }
        };

        let records = self.find(related, Some(condition), select, !many).await?;
        if many {
            Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
        } else {
            Ok(records
                .into_iter()
                .next()
                .map(Value::Object)
                .unwrap_or(Value::Null))
        }
    }
}

fn row_to_record(row: &SqliteRow) -> Result<Record, StorageError> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), decode_column(row, index)?);
    }
    Ok(record)
}

/// Decode a column by trying the SQLite storage classes in turn.
fn decode_column(row: &SqliteRow, index: usize) -> Result<Value, StorageError> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }
    let value = row.try_get::<Option<String>, _>(index)?;
    Ok(value.map(Value::String).unwrap_or(Value::Null))
}

/// Storage client over a SQLite pool.
#[derive(Clone)]
pub struct SqliteStorage {
    catalog: Arc<Catalog>,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool, models: impl IntoIterator<Item = SqliteModel>) -> Self {
        let models = models
            .into_iter()
            .map(|model| (model.name.clone(), model))
            .collect();
        Self {
            catalog: Arc::new(Catalog { pool, models }),
        }
    }
}

impl StorageClient for SqliteStorage {
    fn accessor(&self, model: &str) -> Option<Arc<dyn ModelAccessor>> {
        if !self.catalog.models.contains_key(model) {
            return None;
        }
        Some(Arc::new(SqliteAccessor {
            catalog: self.catalog.clone(),
            model: model.to_string(),
        }))
    }
}

struct SqliteAccessor {
    catalog: Arc<Catalog>,
    model: String,
}

impl SqliteAccessor {
    async fn fetch(&self, query: FindQuery, first_only: bool) -> Result<Vec<Record>, StorageError> {
        let model = self.catalog.model(&self.model)?;
        let condition = query
            .filter
            .as_ref()
            .map(|filter| self.catalog.filter_condition(model, filter))
            .transpose()?;
        self.catalog
            .find(model, condition, &query.select, first_only)
            .await
    }
}

#[async_trait]
impl ModelAccessor for SqliteAccessor {
    async fn find_many(&self, query: FindQuery) -> Result<Vec<Record>, StorageError> {
        self.fetch(query, false).await
    }

    async fn find_first(&self, query: FindQuery) -> Result<Option<Record>, StorageError> {
        Ok(self.fetch(query, true).await?.into_iter().next())
    }
}
