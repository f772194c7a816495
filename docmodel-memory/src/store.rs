//! In-memory storage backend.
//!
//! Stores records as BSON documents in insertion-ordered collections behind
//! an async-aware read-write lock. Queries scan the whole collection; for
//! development and test fixtures this is the point, not a problem.

use std::{collections::HashMap, collections::HashSet, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use tracing::debug;

use docmodel_core::{
    backend::{ImportSummary, QueryOutput, StoreBackend},
    error::{ModelError, ModelResult},
    query::{Projection, QueryExpression},
};

use crate::evaluator::{compare_records, matches_all, matches_example};

/// Records in insertion order; each carries its `_key` inline.
type CollectionVec = Vec<Document>;
type StoreMap = HashMap<String, CollectionVec>;

/// Thread-safe in-memory storage backend.
///
/// `MemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones share the same underlying data and the store can be handed to
/// several models at once.
///
/// Collections preserve insertion order, which makes unsorted query results
/// deterministic. Keys are assigned on import as UUIDs unless a record
/// already carries a `_key`.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::MemoryStore;
/// use docmodel_core::model::Model;
///
/// let store = MemoryStore::new();
/// let model = Model::open("users", store.clone(), None).await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    /// The main storage map: collection name -> records in insertion order.
    collections: Arc<RwLock<StoreMap>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(StoreMap::new())),
        }
    }
}

/// Merges patch fields into a stored record. `_key` and `_id` are
/// store-managed and never overwritten.
fn merge_into(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        if key == "_key" || key == "_id" {
            continue;
        }

        target.insert(key.clone(), value.clone());
    }
}

fn record_key(record: &Document) -> Option<&str> {
    record.get_str("_key").ok()
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn collection_exists(&self, name: &str) -> ModelResult<bool> {
        Ok(self
            .collections
            .read()
            .await
            .contains_key(name))
    }

    async fn create_collection(&self, name: &str) -> ModelResult<()> {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> ModelResult<()> {
        let mut collections = self.collections.write().await;

        if collections.remove(name).is_none() {
            return Err(ModelError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> ModelResult<Vec<String>> {
        Ok(self
            .collections
            .read()
            .await
            .keys()
            .cloned()
            .collect())
    }

    async fn execute_query(&self, query: QueryExpression) -> ModelResult<QueryOutput> {
        let collections = self.collections.read().await;
        let records = match collections.get(&query.collection) {
            Some(records) => records,
            // A missing collection reads as empty.
            None => {
                return Ok(match query.projection {
                    Projection::Records => QueryOutput::Records(vec![]),
                    Projection::Count => QueryOutput::Count(0),
                });
            }
        };

        let mut matched = records
            .iter()
            .filter(|record| matches_all(record, &query.filters))
            .cloned()
            .collect::<Vec<_>>();

        match query.projection {
            Projection::Count => Ok(QueryOutput::Count(matched.len() as u64)),
            Projection::Records => {
                if !query.sorts.is_empty() {
                    // Stable sort keeps insertion order for fully tied records.
                    matched.sort_by(|a, b| compare_records(a, b, &query.sorts));
                }

                let matched = match query.window {
                    Some(window) => matched
                        .into_iter()
                        .skip(window.skip)
                        .take(window.limit)
                        .collect(),
                    None => matched,
                };

                Ok(QueryOutput::Records(matched))
            }
        }
    }

    async fn import_batch(
        &self,
        collection: &str,
        records: Vec<Document>,
    ) -> ModelResult<ImportSummary> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .entry(collection.to_string())
            .or_default();

        let mut existing_keys = stored
            .iter()
            .filter_map(record_key)
            .map(str::to_string)
            .collect::<HashSet<_>>();

        let mut summary = ImportSummary::default();

        for mut record in records {
            let key = match record_key(&record) {
                Some(key) => {
                    if existing_keys.contains(key) {
                        summary.errors += 1;
                        continue;
                    }
                    key.to_string()
                }
                None => {
                    let key = uuid::Uuid::new_v4().simple().to_string();
                    record.insert("_key", Bson::String(key.clone()));
                    key
                }
            };

            // Accepted keys join the set so a batch cannot collide with itself.
            existing_keys.insert(key.clone());

            record.insert("_id", Bson::String(format!("{collection}/{key}")));
            stored.push(record);
            summary.created += 1;
        }

        debug!(
            collection,
            created = summary.created,
            errors = summary.errors,
            "imported batch"
        );

        Ok(summary)
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> ModelResult<Option<Document>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .and_then(|records| {
                records
                    .iter()
                    .find(|record| record_key(record) == Some(key))
            })
            .cloned())
    }

    async fn update_by_key(
        &self,
        collection: &str,
        key: &str,
        new_value: Document,
    ) -> ModelResult<()> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ModelError::CollectionNotFound(collection.to_string()))?;

        let record = records
            .iter_mut()
            .find(|record| record_key(record) == Some(key))
            .ok_or_else(|| {
                ModelError::RecordNotFound(key.to_string(), collection.to_string())
            })?;

        merge_into(record, &new_value);

        Ok(())
    }

    async fn bulk_update(&self, collection: &str, updates: Vec<Document>) -> ModelResult<()> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ModelError::CollectionNotFound(collection.to_string()))?;

        for update in &updates {
            let key = record_key(update).ok_or_else(|| {
                ModelError::Store("bulk update record is missing its _key".to_string())
            })?;

            let record = records
                .iter_mut()
                .find(|record| record_key(record) == Some(key))
                .ok_or_else(|| {
                    ModelError::RecordNotFound(key.to_string(), collection.to_string())
                })?;

            merge_into(record, update);
        }

        Ok(())
    }

    async fn update_by_example(
        &self,
        collection: &str,
        example: Document,
        new_value: Document,
    ) -> ModelResult<u64> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ModelError::CollectionNotFound(collection.to_string()))?;

        let mut updated = 0;

        for record in records
            .iter_mut()
            .filter(|record| matches_example(record, &example))
        {
            merge_into(record, &new_value);
            updated += 1;
        }

        Ok(updated)
    }

    async fn remove_by_keys(&self, collection: &str, keys: Vec<String>) -> ModelResult<u64> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ModelError::CollectionNotFound(collection.to_string()))?;

        let keys = keys
            .iter()
            .map(String::as_str)
            .collect::<HashSet<_>>();

        let before = records.len();
        records.retain(|record| !record_key(record).is_some_and(|key| keys.contains(key)));

        Ok((before - records.len()) as u64)
    }

    async fn remove_by_example(&self, collection: &str, example: Document) -> ModelResult<u64> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ModelError::CollectionNotFound(collection.to_string()))?;

        let before = records.len();
        records.retain(|record| !matches_example(record, &example));

        Ok((before - records.len()) as u64)
    }

    async fn find_by_example(
        &self,
        collection: &str,
        example: Document,
        limit: usize,
    ) -> ModelResult<Vec<Document>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| matches_example(record, &example))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn truncate(&self, collection: &str) -> ModelResult<()> {
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ModelError::CollectionNotFound(collection.to_string()))?;

        records.clear();

        Ok(())
    }

    async fn count(&self, collection: &str) -> ModelResult<u64> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|records| records.len() as u64)
            .unwrap_or(0))
    }
}
