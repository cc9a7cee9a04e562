//! Set-style patches and write results.

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::store::document::{DocumentId, JsonMap, ID_FIELD};

/// A set-style patch: top-level fields to overwrite wholesale.
///
/// Nested structures must be recomputed in full by the caller; a patch never
/// merges into a nested object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    set: JsonMap,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Patch::insert`].
    pub fn set(mut self, field: &str, value: JsonValue) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: JsonValue) {
        self.set.insert(field.to_string(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.set.iter()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// The patch as a JSON object, as sent to the store.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.set.clone())
    }

    /// Checks that every field is a plain top-level name other than `_id`.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.set.is_empty() {
            return Err(AppError::Validation("patch sets no fields".to_string()));
        }
        for field in self.set.keys() {
            if field.is_empty() || field.contains('.') || field.starts_with('$') {
                return Err(AppError::Validation(format!(
                    "patch field '{}' is not a top-level field name",
                    field
                )));
            }
            if field == ID_FIELD {
                return Err(AppError::Validation("patch must not overwrite _id".to_string()));
            }
        }
        Ok(())
    }
}

/// One queued update of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOne {
    pub id: DocumentId,
    pub patch: Patch,
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents selected by the update.
    pub matched: u64,
    /// Documents whose stored value actually changed.
    pub modified: u64,
}

impl std::ops::AddAssign for UpdateResult {
    fn add_assign(&mut self, other: Self) {
        self.matched += other.matched;
        self.modified += other.modified;
    }
}

/// A rejected operation inside a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteError {
    /// Position of the operation in the submitted batch.
    pub index: usize,
    pub id: DocumentId,
    pub message: String,
}

/// Outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteResult {
    pub matched: u64,
    pub modified: u64,
    /// Operations that were applied.
    pub applied: u64,
    /// Operations the store rejected. Empty on full success.
    pub errors: Vec<WriteError>,
}

impl BulkWriteResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
