//! Application error types for migration steps and store backends.

use thiserror::Error;

/// Application-level errors for catalog migrations.
///
/// Every variant is fatal to the migration step that raised it. Nothing is
/// retried; the operator fixes the cause and re-runs the step.
#[derive(Error, Debug)]
pub enum AppError {
    // Taxonomy of a bulk transform
    #[error("Scan of '{collection}' failed: {message}")]
    Scan { collection: String, message: String },

    #[error("Lookup of uid {uid} in '{collection}' failed: {message}")]
    Lookup {
        collection: String,
        uid: i64,
        message: String,
    },

    #[error(
        "Bulk write on '{collection}' rejected ({applied} applied, failed ids: {failed_ids:?}): {message}"
    )]
    BulkWrite {
        collection: String,
        failed_ids: Vec<String>,
        applied: u64,
        message: String,
    },

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Store query failed: {message}")]
    Query { message: String, query: String },

    // Document errors
    #[error("Document '{id}' in '{collection}' has an unexpected shape: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    // Step errors
    #[error("Unknown migration step: {0}")]
    UnknownStep(String),

    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<AppError>,
    },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps a store failure that happened while scanning `collection`.
    pub fn scan(collection: &str, err: impl std::fmt::Display) -> Self {
        AppError::Scan {
            collection: collection.to_string(),
            message: err.to_string(),
        }
    }

    /// Wraps a store failure that happened while resolving `uid`.
    pub fn lookup(collection: &str, uid: i64, err: impl std::fmt::Display) -> Self {
        AppError::Lookup {
            collection: collection.to_string(),
            uid,
            message: err.to_string(),
        }
    }

    /// Attaches the step id to an error raised inside that step.
    pub fn in_step(self, step: &str) -> Self {
        AppError::Step {
            step: step.to_string(),
            source: Box::new(self),
        }
    }
}
