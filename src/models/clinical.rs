//! Views over clinical analysis documents.
//!
//! A clinical analysis embeds a `family` with `members` and a `proband`.
//! Members and the proband carry `father`/`mother` sub-references and
//! embedded `samples`.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::keep_null;
use crate::store::{as_uid, json_type_name, JsonMap};

/// Which parent sub-reference of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    Father,
    Mother,
}

impl ParentRole {
    pub const ALL: [ParentRole; 2] = [ParentRole::Father, ParentRole::Mother];

    /// Field name of the sub-reference inside a member.
    pub fn field(self) -> &'static str {
        match self {
            ParentRole::Father => "father",
            ParentRole::Mother => "mother",
        }
    }
}

/// A member's `father` or `mother` sub-reference.
///
/// Unknown fields are kept, so a rewritten reference only differs in `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentReference {
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub uid: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ParentReference {
    /// The numeric uid, if the reference carries one.
    pub fn uid(&self) -> Option<i64> {
        self.uid.as_ref().and_then(as_uid)
    }

    /// Sets `id`, returning true if the stored value changed.
    pub fn set_id(&mut self, id: &str) -> bool {
        if self.id.as_ref().and_then(|v| v.as_str()) == Some(id) {
            return false;
        }
        self.id = Some(JsonValue::String(id.to_string()));
        true
    }
}

/// Identity fields of an embedded sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleReference {
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub uid: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub version: Option<JsonValue>,
}

/// Identity fields of a family member or proband, plus its sample references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberReference {
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub uid: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub version: Option<JsonValue>,
    /// Trimmed to [`SampleReference`]s when it is an array, otherwise kept as is.
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub samples: Option<JsonValue>,
}

/// Identity fields of a family, plus its member references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyReference {
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub uid: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub version: Option<JsonValue>,
    /// Trimmed to [`MemberReference`]s when it is an array, otherwise kept as is.
    #[serde(default, deserialize_with = "keep_null", skip_serializing_if = "Option::is_none")]
    pub members: Option<JsonValue>,
}

impl SampleReference {
    /// Strips an embedded sample. A null sample stays null.
    pub fn trim(value: &JsonValue) -> Result<JsonValue, serde_json::Error> {
        let sample: SampleReference = from_object(value, "sample")?;
        serde_json::to_value(sample)
    }
}

impl MemberReference {
    /// Strips an embedded member or proband. A null member stays null.
    pub fn trim(value: &JsonValue) -> Result<JsonValue, serde_json::Error> {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }
        let mut member: MemberReference = from_object(value, "member")?;
        if let Some(JsonValue::Array(samples)) = &member.samples {
            let trimmed = samples
                .iter()
                .map(|s| {
                    if s.is_null() {
                        Ok(JsonValue::Null)
                    } else {
                        SampleReference::trim(s)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            member.samples = Some(JsonValue::Array(trimmed));
        }
        serde_json::to_value(member)
    }
}

impl FamilyReference {
    /// Strips an embedded family and every member in it.
    pub fn trim(value: &JsonValue) -> Result<JsonValue, serde_json::Error> {
        let mut family: FamilyReference = from_object(value, "family")?;
        if let Some(JsonValue::Array(members)) = &family.members {
            let trimmed = members
                .iter()
                .map(MemberReference::trim)
                .collect::<Result<Vec<_>, _>>()?;
            family.members = Some(JsonValue::Array(trimmed));
        }
        serde_json::to_value(family)
    }
}

/// Decodes a view, refusing anything but a JSON object.
fn from_object<T: serde::de::DeserializeOwned>(
    value: &JsonValue,
    what: &str,
) -> Result<T, serde_json::Error> {
    if !value.is_object() {
        return Err(serde_json::Error::custom(format!(
            "expected {} object, got {}",
            what,
            json_type_name(value)
        )));
    }
    serde_json::from_value(value.clone())
}
