//! Catalog data migrations.
//!
//! Each release directory holds the steps of one upgrade, registered in the
//! order an operator would normally run them.

mod runner;
mod traits;

pub mod v2_0_0_rc2;

pub use runner::{run_all, run_steps};
pub use traits::{MigrationStep, Register, StepContext, StepReport};
pub use v2_0_0_rc2::create_register;

use crate::error::AppError;
use crate::store::{Document, ID_FIELD};

/// Wraps a view decoding failure with the document it came from.
pub(crate) fn decode_error(collection: &str, doc: &Document, err: impl std::fmt::Display) -> AppError {
    AppError::Decode {
        collection: collection.to_string(),
        id: doc
            .get(ID_FIELD)
            .map(|id| match id.as_str() {
                Some(s) => s.to_string(),
                None => id.to_string(),
            })
            .unwrap_or_else(|| "<no _id>".to_string()),
        message: err.to_string(),
    }
}
