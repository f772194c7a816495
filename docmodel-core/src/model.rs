//! Collection-backed model orchestration.
//!
//! A [`Model`] binds a named collection, a [`StoreBackend`], and an optional
//! [`Schema`], and exposes the create/find/update/delete/count surface.
//! Construction is two-phase: [`Model::open`] ensures the collection exists
//! before returning a ready handle, so no operation races collection
//! creation.
//!
//! The model is stateless after construction; it is safe to share across
//! tasks, and every call is an independent unit of work. Parse and
//! validation failures surface before any store call is issued. Timestamps
//! are stamped by the model: `createdAt` once on create, `updatedAt` on
//! every update path, one shared value per batch call.
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::model::{FindOptions, Model};
//!
//! let model = Model::open("users", backend, None).await?;
//!
//! model.create(doc! { "name": "Alice", "age": 30 }).await?;
//!
//! let adults = model
//!     .find(FindOptions::new().filter("age >= 18")?.sort("name ASC")?)
//!     .await?;
//! ```

use bson::{Bson, Document};
use chrono::Utc;
use tracing::debug;

use crate::backend::{ImportSummary, StoreBackend};
use crate::error::ModelResult;
use crate::expr::{parse_filter, parse_sort, FilterExpr, SortKey};
use crate::query::{build_count_query, build_query, Window};
use crate::schema::{validate, validate_one, RecordBatch, Schema};

/// Options for a find/find-one/count operation.
///
/// Filter and sort expressions are parsed once, at construction, into
/// structured predicates; reusing an options value never re-parses. The
/// pagination window defaults to skip 0, limit 100.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    filters: Vec<FilterExpr>,
    sorts: Vec<SortKey>,
    window: Window,
}

impl FindOptions {
    /// Creates empty options: no filters, no sort, default window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter expression, e.g. `"test >= 2"` or `"name LIKE qwe%"`.
    ///
    /// # Errors
    ///
    /// Fails immediately on a malformed expression or unsupported operator.
    pub fn filter(mut self, expr: &str) -> ModelResult<Self> {
        self.filters.push(parse_filter(expr)?);
        Ok(self)
    }

    /// Appends an already-parsed filter predicate.
    pub fn filter_expr(mut self, expr: FilterExpr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Appends a sort expression, e.g. `"test ASC"` or `"test 1"`.
    ///
    /// # Errors
    ///
    /// Fails immediately on a malformed expression or invalid direction.
    pub fn sort(mut self, expr: &str) -> ModelResult<Self> {
        self.sorts.push(parse_sort(expr)?);
        Ok(self)
    }

    /// Appends an already-parsed sort key.
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.sorts.push(key);
        self
    }

    /// Sets the number of records to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.window.skip = skip;
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.window.limit = limit;
        self
    }
}

/// An update operation, dispatched explicitly by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Merge `new_value` into the record with the given key.
    /// Patch semantics: the new value is not schema-validated.
    ByKey {
        /// The record key.
        key: String,
        /// Fields to merge into the record.
        new_value: Document,
    },
    /// Update whole records carrying their own `_key`, each validated
    /// against the schema.
    Bulk(Vec<Document>),
    /// Merge `new_value` into every record matching the example pattern.
    /// Only `new_value` is validated.
    ByExample {
        /// The example pattern to match.
        example: Document,
        /// Fields to merge into each match.
        new_value: Document,
    },
}

/// A delete operation, dispatched explicitly by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Delete {
    /// Remove the record with the given key.
    ByKey(String),
    /// Remove the records with the given keys; missing keys are skipped.
    ByKeys(Vec<String>),
    /// Remove every record matching the example pattern.
    ByExample(Document),
}

/// A model bound to a named collection.
///
/// Cheap to share by reference; backends are typically `Clone` with shared
/// interior state, so a model can also be cloned when the backend is.
#[derive(Debug)]
pub struct Model<B: StoreBackend> {
    name: String,
    backend: B,
    schema: Option<Schema>,
}

impl<B: StoreBackend> Model<B> {
    /// Opens a model over a named collection, creating the collection if it
    /// does not exist yet. The returned handle is fully ready; no further
    /// initialization is deferred.
    ///
    /// # Errors
    ///
    /// Fails if the collection name is not a valid identifier or the store
    /// cannot create the collection.
    pub async fn open(name: &str, backend: B, schema: Option<Schema>) -> ModelResult<Self> {
        crate::expr::validate_identifier(name)?;

        if !backend.collection_exists(name).await? {
            backend.create_collection(name).await?;
            debug!(collection = name, "created collection");
        }

        Ok(Self { name: name.to_string(), backend, schema })
    }

    /// The collection name this model operates on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates one or more records.
    ///
    /// The batch is validated against the schema, then every record is
    /// stamped with the same `createdAt` timestamp (epoch milliseconds) and
    /// bulk-imported. The store assigns each record its unique key.
    ///
    /// # Errors
    ///
    /// Propagates validation failures (nothing is committed) and store
    /// failures.
    pub async fn create(&self, data: impl Into<RecordBatch>) -> ModelResult<ImportSummary> {
        let now = Utc::now().timestamp_millis();

        let records = validate(data, self.schema.as_ref())?
            .into_iter()
            .map(|mut record| {
                record.insert("createdAt", Bson::Int64(now));
                record
            })
            .collect::<Vec<_>>();

        self.backend
            .import_batch(&self.name, records)
            .await
    }

    /// Finds records matching the options' filters, in sort order, within
    /// the pagination window.
    ///
    /// The result is a finite snapshot; a fresh call re-queries the store.
    pub async fn find(&self, opts: FindOptions) -> ModelResult<Vec<Document>> {
        let query = build_query(&self.name, opts.filters, opts.sorts, opts.window)?;
        debug!(collection = %self.name, query = %query.to_aql().text, "executing find");

        self.backend
            .execute_query(query)
            .await?
            .into_records()
    }

    /// Finds up to `limit` records whose fields match the example pattern
    /// exactly (superset match). Pass `None` for the default limit of 100.
    pub async fn find_by(
        &self,
        example: Document,
        limit: impl Into<Option<usize>>,
    ) -> ModelResult<Vec<Document>> {
        let limit = limit.into().unwrap_or(Window::default().limit);

        self.backend
            .find_by_example(&self.name, example, limit)
            .await
    }

    /// Finds the first record matching the options, applying filters, sort,
    /// and skip with a forced limit of 1.
    pub async fn find_one(&self, opts: FindOptions) -> ModelResult<Option<Document>> {
        let records = self.find(opts.limit(1)).await?;

        Ok(records.into_iter().next())
    }

    /// Fetches a single record by its key.
    pub async fn get(&self, key: &str) -> ModelResult<Option<Document>> {
        self.backend
            .get_by_key(&self.name, key)
            .await
    }

    /// Applies an update, stamping every written record with one shared
    /// `updatedAt` timestamp. Returns the number of records updated.
    ///
    /// # Errors
    ///
    /// Propagates validation failures (for [`Update::Bulk`] and
    /// [`Update::ByExample`]) and store failures.
    pub async fn update(&self, update: Update) -> ModelResult<u64> {
        let now = Utc::now().timestamp_millis();

        match update {
            Update::ByKey { key, mut new_value } => {
                new_value.insert("updatedAt", Bson::Int64(now));

                self.backend
                    .update_by_key(&self.name, &key, new_value)
                    .await?;

                Ok(1)
            }
            Update::Bulk(records) => {
                let records = validate(records, self.schema.as_ref())?
                    .into_iter()
                    .map(|mut record| {
                        record.insert("updatedAt", Bson::Int64(now));
                        record
                    })
                    .collect::<Vec<_>>();

                let updated = records.len() as u64;

                self.backend
                    .bulk_update(&self.name, records)
                    .await?;

                Ok(updated)
            }
            Update::ByExample { example, new_value } => {
                let mut new_value = validate_one(new_value, self.schema.as_ref())?;

                new_value.insert("updatedAt", Bson::Int64(now));

                self.backend
                    .update_by_example(&self.name, example, new_value)
                    .await
            }
        }
    }

    /// Applies a delete. Returns the number of records removed.
    pub async fn delete(&self, delete: Delete) -> ModelResult<u64> {
        match delete {
            Delete::ByKey(key) => {
                self.backend
                    .remove_by_keys(&self.name, vec![key])
                    .await
            }
            Delete::ByKeys(keys) => {
                self.backend
                    .remove_by_keys(&self.name, keys)
                    .await
            }
            Delete::ByExample(example) => {
                self.backend
                    .remove_by_example(&self.name, example)
                    .await
            }
        }
    }

    /// Removes every record in the collection.
    pub async fn delete_all(&self) -> ModelResult<()> {
        self.backend.truncate(&self.name).await
    }

    /// Counts records. With filters in the options, builds a filtered count
    /// query; without, delegates to the store's native count. Sort and
    /// window settings are ignored.
    pub async fn count(&self, opts: FindOptions) -> ModelResult<u64> {
        if opts.filters.is_empty() {
            return self.backend.count(&self.name).await;
        }

        let query = build_count_query(&self.name, opts.filters)?;

        self.backend
            .execute_query(query)
            .await?
            .into_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::expr::{FilterOp, Operand, SortDirection};

    #[test]
    fn find_options_parse_once() {
        let opts = FindOptions::new()
            .filter("test >= 2")
            .unwrap()
            .sort("test ASC")
            .unwrap()
            .skip(5)
            .limit(10);

        assert_eq!(
            opts.filters,
            vec![FilterExpr {
                field: "test".to_string(),
                op: FilterOp::Gte,
                operand: Operand::Number(2.0),
            }]
        );
        assert_eq!(opts.sorts[0].direction, SortDirection::Asc);
        assert_eq!(opts.window, Window { skip: 5, limit: 10 });
    }

    #[test]
    fn find_options_surface_parse_errors() {
        assert!(matches!(
            FindOptions::new().filter("test >"),
            Err(ModelError::InvalidExpression(_))
        ));
        assert!(matches!(
            FindOptions::new().sort("test UP"),
            Err(ModelError::InvalidSortDirection(_))
        ));
    }

    #[test]
    fn default_window_is_first_hundred() {
        let opts = FindOptions::new();
        assert_eq!(opts.window, Window { skip: 0, limit: 100 });
    }
}
