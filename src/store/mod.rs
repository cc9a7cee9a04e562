//! Document store abstraction for catalog collections.
//!
//! The migration core never talks to a database directly. Everything goes
//! through an explicit [`DocumentStore`] handle, so the same steps run
//! against PostgreSQL, a dump directory or an in-memory store.
//!
//! # Usage
//!
//! ```ignore
//! use catalog_migrate::store::{DocumentStore, Filter, Patch, Projection};
//!
//! // Point lookup
//! let individual = store
//!     .find_one("individual", &Filter::eq("uid", 7), &Projection::include(["id"]))
//!     .await?;
//!
//! // Filtered update
//! let result = store
//!     .update_many("file", &Filter::is_null("jobId"), &Patch::new().set("jobId", json!("")))
//!     .await?;
//! ```

mod document;
mod filter;
mod patch;
mod traits;

pub mod backends;

pub use document::{as_uid, json_type_name, Document, DocumentId, DocumentStream, JsonMap, ID_FIELD};
pub use filter::{values_equal, Filter, Projection};
pub use patch::{BulkWriteResult, Patch, UpdateOne, UpdateResult, WriteError};
pub use traits::DocumentStore;
