//! Bulk document transformer.
//!
//! A transform runs in two phases. The scan phase streams the documents of a
//! collection that match a filter and hands each one to a callback, which may
//! queue one set-style update for it on a [`BulkWriter`]. The write phase
//! starts only after the scan is exhausted and submits every queued update as
//! one bulk write. Callbacks therefore always see pre-transform state.
//!
//! # Example
//!
//! ```ignore
//! use catalog_migrate::store::{Filter, Patch, Projection};
//! use catalog_migrate::transform::{BulkWriter, Transformer};
//!
//! let stats = Transformer::new(store)
//!     .transform(
//!         "clinical",
//!         &Filter::all(),
//!         &Projection::include(["family"]),
//!         &|bulk: &mut BulkWriter, doc: Document| {
//!             bulk.update_one(doc.id()?, Patch::new().set("family", json!(null)))
//!         },
//!     )
//!     .await?;
//! ```

mod resolver;

pub use resolver::{resolve, ReferenceMap};

use std::collections::HashSet;

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};

use crate::error::AppError;
use crate::store::{
    Document, DocumentId, DocumentStore, Filter, Patch, Projection, UpdateOne, UpdateResult, ID_FIELD,
};

/// Counters reported by a transform or a filtered update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Documents handed to the callback.
    pub visited: u64,
    /// Updates queued for the write phase.
    pub queued: u64,
    /// Documents the store matched when writing.
    pub matched: u64,
    /// Documents whose stored value changed.
    pub modified: u64,
}

impl From<UpdateResult> for TransformStats {
    fn from(result: UpdateResult) -> Self {
        Self {
            visited: result.matched,
            queued: result.matched,
            matched: result.matched,
            modified: result.modified,
        }
    }
}

impl std::ops::AddAssign for TransformStats {
    fn add_assign(&mut self, other: Self) {
        self.visited += other.visited;
        self.queued += other.queued;
        self.matched += other.matched;
        self.modified += other.modified;
    }
}

/// Collects the updates queued during a scan.
///
/// Holds at most one update per document.
#[derive(Debug)]
pub struct BulkWriter {
    collection: String,
    ops: Vec<UpdateOne>,
    queued: HashSet<DocumentId>,
}

impl BulkWriter {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            ops: Vec::new(),
            queued: HashSet::new(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Queues an update for the document `id`.
    ///
    /// Fails if the patch is invalid or the document already has an update.
    pub fn update_one(&mut self, id: DocumentId, patch: Patch) -> Result<(), AppError> {
        patch.validate()?;
        if !self.queued.insert(id.clone()) {
            return Err(AppError::Validation(format!(
                "document '{}' in '{}' already has a queued update",
                id, self.collection
            )));
        }
        self.ops.push(UpdateOne { id, patch });
        Ok(())
    }

    pub fn operations(&self) -> &[UpdateOne] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Per-document callback of a transform.
///
/// Uses BoxFuture so implementations can borrow the store for lookups.
/// Plain closures `Fn(&mut BulkWriter, Document) -> Result<(), AppError>`
/// implement it directly.
pub trait DocumentTransform: Send + Sync {
    fn apply<'a>(
        &'a self,
        store: &'a dyn DocumentStore,
        bulk: &'a mut BulkWriter,
        doc: Document,
    ) -> BoxFuture<'a, Result<(), AppError>>;
}

impl<F> DocumentTransform for F
where
    F: Fn(&mut BulkWriter, Document) -> Result<(), AppError> + Send + Sync,
{
    fn apply<'a>(
        &'a self,
        _store: &'a dyn DocumentStore,
        bulk: &'a mut BulkWriter,
        doc: Document,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        futures::future::ready(self(bulk, doc)).boxed()
    }
}

/// Runs transforms and filtered updates against one store.
#[derive(Clone, Copy)]
pub struct Transformer<'s> {
    store: &'s dyn DocumentStore,
    dry_run: bool,
}

impl<'s> Transformer<'s> {
    pub fn new(store: &'s dyn DocumentStore) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// In a dry run, updates are computed and counted but never written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Scans `collection` and applies the queued updates as one bulk write.
    pub async fn transform(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
        callback: &dyn DocumentTransform,
    ) -> Result<TransformStats, AppError> {
        let mut bulk = BulkWriter::new(collection);
        let mut stats = TransformStats::default();

        let mut stream = self
            .store
            .find(collection, filter, projection)
            .await
            .map_err(|e| AppError::scan(collection, e))?;

        while let Some(doc) = stream
            .try_next()
            .await
            .map_err(|e| AppError::scan(collection, e))?
        {
            stats.visited += 1;
            if let Some(id) = doc.get(ID_FIELD) {
                tracing::debug!(collection, id = %id, "Visiting document");
            }
            callback.apply(self.store, &mut bulk, doc).await?;
        }
        drop(stream);

        stats.queued = bulk.len() as u64;
        tracing::info!(
            collection,
            visited = stats.visited,
            queued = stats.queued,
            "Scan complete"
        );

        if bulk.is_empty() {
            return Ok(stats);
        }
        if self.dry_run {
            tracing::info!(collection, queued = stats.queued, "Dry run, skipping bulk write");
            return Ok(stats);
        }

        let result = match self.store.bulk_write(collection, bulk.operations()).await {
            Ok(result) => result,
            Err(e) => {
                return Err(AppError::BulkWrite {
                    collection: collection.to_string(),
                    failed_ids: bulk.operations().iter().map(|op| op.id.to_string()).collect(),
                    applied: 0,
                    message: e.to_string(),
                })
            }
        };

        if !result.is_success() {
            tracing::error!(
                collection,
                failed = result.errors.len(),
                applied = result.applied,
                "Bulk write rejected"
            );
            return Err(AppError::BulkWrite {
                collection: collection.to_string(),
                failed_ids: result.errors.iter().map(|e| e.id.to_string()).collect(),
                applied: result.applied,
                message: result
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            });
        }

        stats.matched = result.matched;
        stats.modified = result.modified;
        tracing::info!(
            collection,
            matched = stats.matched,
            modified = stats.modified,
            "Bulk write applied"
        );
        Ok(stats)
    }

    /// Applies `patch` to every document matching `filter` in one store call.
    ///
    /// A dry run only counts the matching documents.
    pub async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<TransformStats, AppError> {
        patch.validate()?;

        if self.dry_run {
            let mut stream = self
                .store
                .find(collection, filter, &Projection::include([ID_FIELD]))
                .await
                .map_err(|e| AppError::scan(collection, e))?;
            let mut stats = TransformStats::default();
            while stream
                .try_next()
                .await
                .map_err(|e| AppError::scan(collection, e))?
                .is_some()
            {
                stats.visited += 1;
            }
            stats.queued = stats.visited;
            tracing::info!(collection, queued = stats.queued, "Dry run, skipping update");
            return Ok(stats);
        }

        let result = self
            .store
            .update_many(collection, filter, patch)
            .await
            .map_err(|e| AppError::BulkWrite {
                collection: collection.to_string(),
                failed_ids: Vec::new(),
                applied: 0,
                message: e.to_string(),
            })?;

        tracing::info!(
            collection,
            matched = result.matched,
            modified = result.modified,
            "Filtered update applied"
        );
        Ok(result.into())
    }
}
