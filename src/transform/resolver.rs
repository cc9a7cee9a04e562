//! Memoizing cross-reference resolver.
//!
//! Resolves an internal numeric `uid` to the display `id` of the record that
//! carries it in a reference collection. A [`ReferenceMap`] belongs to the
//! processing of one document and is dropped with it.

use std::collections::HashMap;

use crate::error::AppError;
use crate::store::{DocumentStore, Filter, Projection};

/// Memo of `uid → id` lookups for one document.
///
/// Negative results are cached too, so a missing `uid` is queried once.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    entries: HashMap<i64, Option<String>>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pair already known from the document itself.
    pub fn seed(&mut self, uid: i64, id: impl Into<String>) {
        self.entries.insert(uid, Some(id.into()));
    }

    /// `None` on a miss; `Some(None)` for a cached absent reference.
    pub fn get(&self, uid: i64) -> Option<&Option<String>> {
        self.entries.get(&uid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves `uid` against `collection`, consulting and filling `cache`.
///
/// Returns `None` when no record carries the uid or the record has no string
/// `id`. Callers must leave existing data untouched in that case.
pub async fn resolve(
    cache: &mut ReferenceMap,
    store: &dyn DocumentStore,
    collection: &str,
    uid: i64,
) -> Result<Option<String>, AppError> {
    if let Some(cached) = cache.get(uid) {
        return Ok(cached.clone());
    }

    let found = store
        .find_one(collection, &Filter::eq("uid", uid), &Projection::include(["id"]))
        .await
        .map_err(|e| AppError::lookup(collection, uid, e))?;

    let id = found
        .as_ref()
        .and_then(|doc| doc.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string);
    if id.is_none() {
        tracing::debug!(collection, uid, "Reference not resolved");
    }

    cache.entries.insert(uid, id.clone());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backends::MemoryStore;
    use crate::store::Document;
    use serde_json::json;

    async fn individuals() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .load(
                "individual",
                vec![
                    Document::from_json(json!({"_id": "i7", "uid": 7, "id": "IND7"})).unwrap(),
                    Document::from_json(json!({"_id": "i8", "uid": 8, "id": 8})).unwrap(),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_resolve_hits_store_then_cache() {
        let store = individuals().await;
        let mut cache = ReferenceMap::new();

        let first = resolve(&mut cache, &store, "individual", 7).await.unwrap();
        let second = resolve(&mut cache, &store, "individual", 7).await.unwrap();

        assert_eq!(first.as_deref(), Some("IND7"));
        assert_eq!(second, first);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_caches_absent_references() {
        let store = individuals().await;
        let mut cache = ReferenceMap::new();

        assert_eq!(resolve(&mut cache, &store, "individual", 99).await.unwrap(), None);
        assert_eq!(cache.get(99), Some(&None));
    }

    #[tokio::test]
    async fn test_resolve_ignores_non_string_ids() {
        let store = individuals().await;
        let mut cache = ReferenceMap::new();

        assert_eq!(resolve(&mut cache, &store, "individual", 8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_seeded_pairs_skip_the_store() {
        let store = MemoryStore::new();
        let mut cache = ReferenceMap::new();
        cache.seed(7, "IND7");

        let id = resolve(&mut cache, &store, "individual", 7).await.unwrap();

        assert_eq!(id.as_deref(), Some("IND7"));
    }
}
