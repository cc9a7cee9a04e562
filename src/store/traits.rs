//! Core trait for document store abstraction.
//!
//! [`DocumentStore`] is the whole surface the migration core needs from a
//! database: filtered scans, point updates, filtered updates and bulk writes.

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::error::AppError;
use crate::store::document::{Document, DocumentId, DocumentStream};
use crate::store::filter::{Filter, Projection};
use crate::store::patch::{BulkWriteResult, Patch, UpdateOne, UpdateResult};

/// A collection-oriented document store.
///
/// Implementations must give scans point-in-time semantics: documents
/// written after a scan started are not observed by that scan.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Streams the documents of `collection` that match `filter`, reduced to `projection`.
    ///
    /// Order is unspecified.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<DocumentStream<'_>, AppError>;

    /// Returns the first match of `filter`, if any.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>, AppError> {
        let mut stream = self.find(collection, filter, projection).await?;
        stream.try_next().await
    }

    /// Overwrites the patched fields of one document.
    async fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: &Patch,
    ) -> Result<UpdateResult, AppError>;

    /// Overwrites the patched fields of every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult, AppError>;

    /// Submits a batch of point updates as one operation.
    ///
    /// Rejected operations are reported in [`BulkWriteResult::errors`]; an
    /// `Err` means the batch could not be submitted at all.
    async fn bulk_write(
        &self,
        collection: &str,
        operations: &[UpdateOne],
    ) -> Result<BulkWriteResult, AppError>;

    /// Persists buffered writes. Stores that write through need not override this.
    async fn flush(&self) -> Result<(), AppError> {
        Ok(())
    }
}
