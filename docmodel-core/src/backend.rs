//! Store client abstraction consumed by the model.
//!
//! This module defines the [`StoreBackend`] trait, the async interface every
//! storage backend implements: collection lifecycle, query execution, batch
//! import, and the raw by-key/by-example operations. Implementations are
//! required to be thread-safe (`Send + Sync`) and support concurrent access.
//!
//! The model never retries or suppresses a backend failure; errors surface
//! to the caller unmodified. Cancellation and timeout semantics belong to
//! the backend.

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::{ModelError, ModelResult};
use crate::query::QueryExpression;

/// Outcome summary of a batch import, as reported by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Number of records created.
    pub created: u64,
    /// Number of records the store rejected.
    pub errors: u64,
}

/// The result of executing a [`QueryExpression`]: records or a scalar count,
/// depending on the query's projection.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Matching records in query order.
    Records(Vec<Document>),
    /// Scalar count of the filtered set.
    Count(u64),
}

impl QueryOutput {
    /// Unwraps the record list.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError::Store`] if the backend answered a record query
    /// with a count.
    pub fn into_records(self) -> ModelResult<Vec<Document>> {
        match self {
            QueryOutput::Records(records) => Ok(records),
            QueryOutput::Count(_) => Err(ModelError::Store(
                "backend returned a count for a record query".to_string(),
            )),
        }
    }

    /// Unwraps the scalar count.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError::Store`] if the backend answered a count query
    /// with records.
    pub fn into_count(self) -> ModelResult<u64> {
        match self {
            QueryOutput::Count(count) => Ok(count),
            QueryOutput::Records(_) => Err(ModelError::Store(
                "backend returned records for a count query".to_string(),
            )),
        }
    }
}

/// Abstract interface for document storage backends.
///
/// All methods are async and return [`ModelResult`]. Implementers should
/// document which error variants each operation may produce. The pure query
/// pipeline (filter, sort, window, projection) is described by the
/// [`QueryExpression`] handed to [`execute_query`](StoreBackend::execute_query);
/// everything else operates on explicit keys or example patterns.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Checks whether a collection exists.
    async fn collection_exists(&self, name: &str) -> ModelResult<bool>;

    /// Creates a collection. Creating an existing collection is a no-op.
    async fn create_collection(&self, name: &str) -> ModelResult<()>;

    /// Drops a collection and all its records.
    async fn drop_collection(&self, name: &str) -> ModelResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> ModelResult<Vec<String>>;

    /// Executes a built query and returns records or a count per its
    /// projection.
    async fn execute_query(&self, query: QueryExpression) -> ModelResult<QueryOutput>;

    /// Bulk-imports records into a collection, assigning each a unique key.
    async fn import_batch(
        &self,
        collection: &str,
        records: Vec<Document>,
    ) -> ModelResult<ImportSummary>;

    /// Fetches a single record by key.
    async fn get_by_key(&self, collection: &str, key: &str) -> ModelResult<Option<Document>>;

    /// Merges `new_value` into the record with the given key.
    async fn update_by_key(
        &self,
        collection: &str,
        key: &str,
        new_value: Document,
    ) -> ModelResult<()>;

    /// Merges each record into the stored record carrying the same `_key`.
    async fn bulk_update(&self, collection: &str, records: Vec<Document>) -> ModelResult<()>;

    /// Merges `new_value` into every record matching the example pattern.
    /// Returns the number of records updated.
    async fn update_by_example(
        &self,
        collection: &str,
        example: Document,
        new_value: Document,
    ) -> ModelResult<u64>;

    /// Removes records by key, skipping keys that do not exist.
    /// Returns the number of records removed.
    async fn remove_by_keys(&self, collection: &str, keys: Vec<String>) -> ModelResult<u64>;

    /// Removes every record matching the example pattern.
    /// Returns the number of records removed.
    async fn remove_by_example(&self, collection: &str, example: Document) -> ModelResult<u64>;

    /// Returns up to `limit` records matching the example pattern, where a
    /// match means the record's fields are a superset of the example's.
    async fn find_by_example(
        &self,
        collection: &str,
        example: Document,
        limit: usize,
    ) -> ModelResult<Vec<Document>>;

    /// Removes all records from a collection, keeping the collection itself.
    async fn truncate(&self, collection: &str) -> ModelResult<()>;

    /// Returns the total number of records in a collection.
    async fn count(&self, collection: &str) -> ModelResult<u64>;
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn collection_exists(&self, name: &str) -> ModelResult<bool> {
        (*self).collection_exists(name).await
    }

    async fn create_collection(&self, name: &str) -> ModelResult<()> {
        (*self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> ModelResult<()> {
        (*self).drop_collection(name).await
    }

    async fn list_collections(&self) -> ModelResult<Vec<String>> {
        (*self).list_collections().await
    }

    async fn execute_query(&self, query: QueryExpression) -> ModelResult<QueryOutput> {
        (*self).execute_query(query).await
    }

    async fn import_batch(
        &self,
        collection: &str,
        records: Vec<Document>,
    ) -> ModelResult<ImportSummary> {
        (*self)
            .import_batch(collection, records)
            .await
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> ModelResult<Option<Document>> {
        (*self).get_by_key(collection, key).await
    }

    async fn update_by_key(
        &self,
        collection: &str,
        key: &str,
        new_value: Document,
    ) -> ModelResult<()> {
        (*self)
            .update_by_key(collection, key, new_value)
            .await
    }

    async fn bulk_update(&self, collection: &str, records: Vec<Document>) -> ModelResult<()> {
        (*self)
            .bulk_update(collection, records)
            .await
    }

    async fn update_by_example(
        &self,
        collection: &str,
        example: Document,
        new_value: Document,
    ) -> ModelResult<u64> {
        (*self)
            .update_by_example(collection, example, new_value)
            .await
    }

    async fn remove_by_keys(&self, collection: &str, keys: Vec<String>) -> ModelResult<u64> {
        (*self)
            .remove_by_keys(collection, keys)
            .await
    }

    async fn remove_by_example(&self, collection: &str, example: Document) -> ModelResult<u64> {
        (*self)
            .remove_by_example(collection, example)
            .await
    }

    async fn find_by_example(
        &self,
        collection: &str,
        example: Document,
        limit: usize,
    ) -> ModelResult<Vec<Document>> {
        (*self)
            .find_by_example(collection, example, limit)
            .await
    }

    async fn truncate(&self, collection: &str) -> ModelResult<()> {
        (*self).truncate(collection).await
    }

    async fn count(&self, collection: &str) -> ModelResult<u64> {
        (*self).count(collection).await
    }
}
