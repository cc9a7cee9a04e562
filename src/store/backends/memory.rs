//! In-memory document store.
//!
//! Collections are ordered maps keyed by `_id`. Scans take a snapshot under
//! the read lock and stream from it, so writes issued while a scan is being
//! consumed are never observed by that scan.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::store::document::{Document, DocumentId, DocumentStream};
use crate::store::filter::{Filter, Projection};
use crate::store::patch::{BulkWriteResult, Patch, UpdateOne, UpdateResult};
use crate::store::traits::DocumentStore;

type Collection = BTreeMap<DocumentId, Document>;

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    dirty: HashSet<String>,
}

/// Document store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a document. The document must carry an `_id`.
    pub async fn insert(&self, collection: &str, doc: Document) -> Result<DocumentId, AppError> {
        let id = doc.id()?;
        let mut state = self.state.write().await;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);
        Ok(id)
    }

    /// Replaces a whole collection without marking it dirty.
    pub async fn load(&self, collection: &str, docs: Vec<Document>) -> Result<(), AppError> {
        let mut loaded = Collection::new();
        for doc in docs {
            let id = doc.id().map_err(|e| {
                AppError::Validation(format!("collection '{}': {}", collection, e))
            })?;
            if loaded.insert(id.clone(), doc).is_some() {
                return Err(AppError::Validation(format!(
                    "collection '{}' has duplicate _id '{}'",
                    collection, id
                )));
            }
        }
        let mut state = self.state.write().await;
        state.collections.insert(collection.to_string(), loaded);
        state.dirty.remove(collection);
        Ok(())
    }

    pub async fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        let state = self.state.read().await;
        state.collections.get(collection)?.get(id).cloned()
    }

    /// All documents of a collection in `_id` order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let state = self.state.read().await;
        state
            .collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn collection_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<_> = state.collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns and clears the names of collections modified since the last call.
    pub async fn take_dirty(&self) -> Vec<String> {
        let mut state = self.state.write().await;
        let mut dirty: Vec<_> = state.dirty.drain().collect();
        dirty.sort();
        dirty
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<DocumentStream<'_>, AppError> {
        let snapshot: Vec<Document> = {
            let state = self.state.read().await;
            state
                .collections
                .get(collection)
                .map(|c| {
                    c.values()
                        .filter(|doc| filter.matches(doc))
                        .map(|doc| projection.apply(doc))
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(Box::pin(futures::stream::iter(snapshot.into_iter().map(Ok))))
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: &Patch,
    ) -> Result<UpdateResult, AppError> {
        patch.validate()?;
        let mut state = self.state.write().await;
        let result = match state
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
        {
            Some(doc) => UpdateResult {
                matched: 1,
                modified: doc.apply(patch) as u64,
            },
            None => UpdateResult::default(),
        };
        if result.modified > 0 {
            state.dirty.insert(collection.to_string());
        }
        Ok(result)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult, AppError> {
        patch.validate()?;
        let mut state = self.state.write().await;
        let mut result = UpdateResult::default();
        if let Some(docs) = state.collections.get_mut(collection) {
            for doc in docs.values_mut().filter(|doc| filter.matches(doc)) {
                result.matched += 1;
                result.modified += doc.apply(patch) as u64;
            }
        }
        if result.modified > 0 {
            state.dirty.insert(collection.to_string());
        }
        Ok(result)
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: &[UpdateOne],
    ) -> Result<BulkWriteResult, AppError> {
        for op in operations {
            op.patch.validate()?;
        }

        let mut state = self.state.write().await;
        let mut result = BulkWriteResult::default();
        if let Some(docs) = state.collections.get_mut(collection) {
            for op in operations {
                if let Some(doc) = docs.get_mut(&op.id) {
                    result.matched += 1;
                    result.modified += doc.apply(&op.patch) as u64;
                }
                result.applied += 1;
            }
        } else {
            result.applied = operations.len() as u64;
        }
        if result.modified > 0 {
            state.dirty.insert(collection.to_string());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_json(value).unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .load(
                "file",
                vec![
                    doc(json!({"_id": "f1", "uid": 1, "jobId": null})),
                    doc(json!({"_id": "f2", "uid": 2})),
                    doc(json!({"_id": "f3", "uid": 3, "jobId": "JOB3"})),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_find_filters_and_projects() {
        let store = seeded().await;

        let docs: Vec<_> = store
            .find("file", &Filter::is_null("jobId"), &Projection::include(["uid"]))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].clone().into_json(), json!({"_id": "f1", "uid": 1}));
    }

    #[tokio::test]
    async fn test_find_on_missing_collection_is_empty() {
        let store = MemoryStore::new();

        let found = store
            .find_one("nothing", &Filter::all(), &Projection::all())
            .await
            .unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_scan_is_a_snapshot() {
        let store = seeded().await;

        let mut stream = store
            .find("file", &Filter::all(), &Projection::all())
            .await
            .unwrap();
        store
            .update_one("file", &"f2".into(), &Patch::new().set("jobId", json!("X")))
            .await
            .unwrap();

        let mut seen = vec![];
        while let Some(doc) = stream.try_next().await.unwrap() {
            seen.push(doc);
        }
        assert_eq!(seen.len(), 3);
        assert!(seen[1].get("jobId").is_none());
    }

    #[tokio::test]
    async fn test_update_many_counts_matched_and_modified() {
        let store = seeded().await;
        let patch = Patch::new().set("jobId", json!(""));

        let first = store
            .update_many("file", &Filter::is_null("jobId"), &patch)
            .await
            .unwrap();
        let second = store
            .update_many("file", &Filter::eq("jobId", ""), &patch)
            .await
            .unwrap();

        assert_eq!(first, UpdateResult { matched: 2, modified: 2 });
        assert_eq!(second, UpdateResult { matched: 2, modified: 0 });
        assert_eq!(store.take_dirty().await, vec!["file".to_string()]);
        assert!(store.take_dirty().await.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_write_skips_unknown_ids() {
        let store = seeded().await;
        let ops = vec![
            UpdateOne {
                id: "f1".into(),
                patch: Patch::new().set("jobId", json!("JOB1")),
            },
            UpdateOne {
                id: "missing".into(),
                patch: Patch::new().set("jobId", json!("JOB9")),
            },
        ];

        let result = store.bulk_write("file", &ops).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.matched, 1);
        assert_eq!(result.modified, 1);
        assert_eq!(result.applied, 2);
        let f1 = store.get("file", &"f1".into()).await.unwrap();
        assert_eq!(f1.get("jobId"), Some(&json!("JOB1")));
    }

    #[tokio::test]
    async fn test_load_rejects_duplicate_ids() {
        let store = MemoryStore::new();

        let result = store
            .load(
                "file",
                vec![doc(json!({"_id": "f1"})), doc(json!({"_id": "f1"}))],
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
