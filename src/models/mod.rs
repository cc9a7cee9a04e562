//! Schema-on-read views over catalog documents.
//!
//! Documents stay untyped in the store. Steps decode the parts they touch
//! into these views, each with an explicit unknown-field policy:
//!
//! - full views ([`ParentReference`]) keep unknown fields in a flattened
//!   `extra` map, so writing them back preserves everything;
//! - reference views ([`FamilyReference`], [`MemberReference`],
//!   [`SampleReference`]) drop unknown fields, which is how denormalized
//!   records are stripped to identity fields.

mod clinical;
mod job;

pub use clinical::{FamilyReference, MemberReference, ParentReference, ParentRole, SampleReference};
pub use job::{FileRef, JobFileRefs};

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Keeps a present field as `Some`, even when it is null.
///
/// Paired with `#[serde(default)]` so that a missing field reads as `None`
/// and `skip_serializing_if = "Option::is_none"` so it stays missing.
pub(crate) fn keep_null<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}
