//! Documents, identifiers and document streams.

use std::fmt;
use std::pin::Pin;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;
use crate::store::patch::Patch;

/// Name of the immutable identity field.
pub const ID_FIELD: &str = "_id";

/// A JSON object, the body of a [`Document`].
pub type JsonMap = Map<String, JsonValue>;

/// A stream of documents from a scan.
///
/// Uses `futures::Stream` so large collections are never loaded at once.
pub type DocumentStream<'a> = Pin<Box<dyn Stream<Item = Result<Document, AppError>> + Send + 'a>>;

/// Store-assigned identity of a document (the `_id` field).
///
/// String ids are used as-is; numeric ids use their decimal form and
/// extended-JSON object ids (`{"$oid": "..."}`) use the hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id from a raw `_id` value.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(Self(s.clone())),
            JsonValue::Number(n) => Some(Self(n.to_string())),
            JsonValue::Object(obj) => obj
                .get("$oid")
                .and_then(|v| v.as_str())
                .map(|s| Self(s.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One record of a collection: a JSON object keyed by field name.
///
/// Field values are left untyped. Steps read the parts they care about
/// through [`Document::decode`] or [`Document::decode_field`] into
/// schema-on-read views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(JsonMap);

impl Document {
    pub fn new() -> Self {
        Self(JsonMap::new())
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_json(value: JsonValue) -> Result<Self, AppError> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(AppError::Validation(format!(
                "document must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Returns the document identity.
    pub fn id(&self) -> Result<DocumentId, AppError> {
        self.0
            .get(ID_FIELD)
            .and_then(DocumentId::from_json)
            .ok_or_else(|| AppError::Validation("document has no usable _id".to_string()))
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Follows a dotted path (`family.members`) through nested objects.
    pub fn get_path(&self, path: &str) -> Option<&JsonValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<JsonValue> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Overwrites every field named by the patch. Returns true if anything changed.
    pub fn apply(&mut self, patch: &Patch) -> bool {
        let mut changed = false;
        for (field, value) in patch.fields() {
            if self.0.get(field) != Some(value) {
                self.0.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// Decodes the whole document into a typed view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(JsonValue::Object(self.0.clone()))
    }

    /// Decodes one field into a typed view. Missing and null both read as `None`.
    pub fn decode_field<T: DeserializeOwned>(
        &self,
        field: &str,
    ) -> Result<Option<T>, serde_json::Error> {
        match self.0.get(field) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some),
        }
    }

    pub fn as_map(&self) -> &JsonMap {
        &self.0
    }

    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<JsonMap> for Document {
    fn from(map: JsonMap) -> Self {
        Self(map)
    }
}

/// Detects the JSON type as a string for error messages.
pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::String(_) => "string",
        JsonValue::Number(_) => "number",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
        JsonValue::Null => "null",
    }
}

/// Reads an internal numeric identifier.
///
/// Accepts integers, integral floats and extended-JSON longs
/// (`{"$numberLong": "7"}`), which is how dumps carry 64-bit uids.
pub fn as_uid(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::Object(obj) => obj
            .get("$numberLong")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok()),
        _ => None,
    }
}
