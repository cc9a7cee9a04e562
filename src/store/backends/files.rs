//! JSON dump directory backend.
//!
//! A catalog dump is a directory holding one `<collection>.json` file per
//! collection, each a JSON array of documents. The whole directory is loaded
//! into a [`MemoryStore`] on open. [`DocumentStore::flush`] writes the
//! collections modified since the last flush back to disk, each through a
//! temp file in the same directory that is renamed over the original.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::store::backends::memory::MemoryStore;
use crate::store::document::{Document, DocumentId, DocumentStream};
use crate::store::filter::{Filter, Projection};
use crate::store::patch::{BulkWriteResult, Patch, UpdateOne, UpdateResult};
use crate::store::traits::DocumentStore;

const DUMP_EXTENSION: &str = "json";

/// Document store backed by a directory of JSON dumps.
pub struct FileStore {
    dir: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Loads every `<collection>.json` file found in `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(AppError::Store(format!(
                "dump directory '{}' does not exist",
                dir.display()
            )));
        }

        let inner = MemoryStore::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DUMP_EXTENSION) {
                continue;
            }
            let Some(collection) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let docs = read_dump(&path).await?;
            tracing::debug!(collection, count = docs.len(), "Loaded dump");
            inner.load(collection, docs).await?;
        }

        Ok(Self { dir, inner })
    }

    /// The in-memory view of the loaded dump.
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    fn dump_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", collection, DUMP_EXTENSION))
    }

    /// Writes one collection atomically: temp file in the same directory, then rename.
    async fn save(&self, collection: &str) -> Result<(), AppError> {
        let docs = self.inner.documents(collection).await;
        let body = serde_json::to_vec_pretty(&docs)
            .map_err(|e| AppError::Store(format!("Failed to encode '{}': {}", collection, e)))?;

        let dir = self.dir.clone();
        let target = self.dump_path(collection);
        tokio::task::spawn_blocking(move || -> Result<(), AppError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&body)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| AppError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Dump writer task failed: {}", e)))??;

        tracing::info!(collection, count = docs.len(), "Saved dump");
        Ok(())
    }
}

async fn read_dump(path: &Path) -> Result<Vec<Document>, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let value: JsonValue = serde_json::from_slice(&bytes).map_err(|e| {
        AppError::Store(format!("Failed to parse '{}': {}", path.display(), e))
    })?;
    let JsonValue::Array(items) = value else {
        return Err(AppError::Store(format!(
            "'{}' must hold a JSON array of documents",
            path.display()
        )));
    };
    items.into_iter().map(Document::from_json).collect()
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<DocumentStream<'_>, AppError> {
        self.inner.find(collection, filter, projection).await
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: &Patch,
    ) -> Result<UpdateResult, AppError> {
        self.inner.update_one(collection, id, patch).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateResult, AppError> {
        self.inner.update_many(collection, filter, patch).await
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: &[UpdateOne],
    ) -> Result<BulkWriteResult, AppError> {
        self.inner.bulk_write(collection, operations).await
    }

    async fn flush(&self) -> Result<(), AppError> {
        for collection in self.inner.take_dirty().await {
            self.save(&collection).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_dump(dir: &Path, collection: &str, value: JsonValue) {
        std::fs::write(
            dir.join(format!("{}.json", collection)),
            serde_json::to_vec(&value).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_open_loads_every_dump() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(dir.path(), "file", json!([{"_id": "f1", "uid": 1}]));
        write_dump(dir.path(), "job", json!([{"_id": "j1", "id": "JOB1"}]));
        std::fs::write(dir.path().join("README.txt"), "not a dump").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.memory().collection_names().await, vec!["file", "job"]);
    }

    #[tokio::test]
    async fn test_flush_writes_only_modified_collections() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(dir.path(), "file", json!([{"_id": "f1", "jobId": null}]));
        write_dump(dir.path(), "job", json!([{"_id": "j1", "id": "JOB1"}]));
        let job_before = std::fs::read(dir.path().join("job.json")).unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        store
            .update_many("file", &Filter::is_null("jobId"), &Patch::new().set("jobId", json!("")))
            .await
            .unwrap();
        store.flush().await.unwrap();

        let saved: JsonValue =
            serde_json::from_slice(&std::fs::read(dir.path().join("file.json")).unwrap()).unwrap();
        assert_eq!(saved, json!([{"_id": "f1", "jobId": ""}]));
        assert_eq!(std::fs::read(dir.path().join("job.json")).unwrap(), job_before);
    }

    #[tokio::test]
    async fn test_open_rejects_non_array_dump() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(dir.path(), "file", json!({"_id": "f1"}));

        let result = FileStore::open(dir.path()).await;

        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_open_missing_directory() {
        let result = FileStore::open("/nonexistent/catalog-dump").await;

        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
