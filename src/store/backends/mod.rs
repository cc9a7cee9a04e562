//! Backend implementations of [`DocumentStore`].
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | PostgreSQL JSONB | [`postgres`] | Live catalogs |
//! | JSON dump directory | [`files`] | Offline runs over `<collection>.json` dumps |
//! | In-memory | [`memory`] | Tests and embedding |
//!
//! [`connect`] picks the backend named by the `[store]` config section.

pub mod files;
pub mod memory;
pub mod postgres;

use crate::config::StoreConfig;
use crate::error::AppError;
use crate::store::traits::DocumentStore;

pub use files::FileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Opens the store described by `config`.
pub async fn connect(config: &StoreConfig) -> Result<Box<dyn DocumentStore>, AppError> {
    match config {
        StoreConfig::Postgres { uri, pool_size } => {
            tracing::info!(pool_size, "Connecting to PostgreSQL");
            Ok(Box::new(PostgresStore::connect(uri, *pool_size).await?))
        }
        StoreConfig::Files { path } => {
            tracing::info!(path = %path.display(), "Opening dump directory");
            Ok(Box::new(FileStore::open(path).await?))
        }
    }
}
