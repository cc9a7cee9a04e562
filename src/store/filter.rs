//! Query filters and projections over documents.
//!
//! Paths are dotted field names that walk nested objects (`family.id`).
//! They do not fan out over arrays.

use std::cmp::Ordering;

use serde_json::{json, Value as JsonValue};

use crate::store::document::{as_uid, Document, JsonMap, ID_FIELD};

const NUMBER_LONG: &str = "$numberLong";

/// A predicate over the documents of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals the value. Numbers compare by value, so `-1` matches `-1.0`.
    Eq(String, JsonValue),
    /// Field equals one of the values.
    In(String, Vec<JsonValue>),
    /// Field is null or missing.
    IsNull(String),
    /// Field is present (`true`) or missing (`false`). A null field is present.
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn eq(path: &str, value: impl Into<JsonValue>) -> Self {
        Filter::Eq(path.to_string(), value.into())
    }

    pub fn is_in<V: Into<JsonValue>>(path: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(path.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(path: &str) -> Self {
        Filter::IsNull(path.to_string())
    }

    pub fn exists(path: &str, present: bool) -> Self {
        Filter::Exists(path.to_string(), present)
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, expected) => doc
                .get_path(path)
                .is_some_and(|actual| values_equal(actual, expected)),
            Filter::In(path, candidates) => doc
                .get_path(path)
                .is_some_and(|actual| candidates.iter().any(|c| values_equal(actual, c))),
            Filter::IsNull(path) => matches!(doc.get_path(path), None | Some(JsonValue::Null)),
            Filter::Exists(path, present) => doc.get_path(path).is_some() == *present,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Compares two JSON values the way the catalog store does: numbers by value,
/// everything else structurally.
///
/// An extended-JSON long (`{"$numberLong": "7"}`) equals the integral number
/// of the same value.
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y) == Some(Ordering::Equal),
                _ => x == y,
            },
        },
        (JsonValue::Object(_), _) | (_, JsonValue::Object(_))
            if number_long(a).is_some() || number_long(b).is_some() =>
        {
            match (long_value(a), long_value(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (JsonValue::Object(xs), JsonValue::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// The value of a single-key `{"$numberLong": "..."}` object.
fn number_long(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Object(obj) if obj.len() == 1 => obj.get(NUMBER_LONG)?.as_str()?.parse().ok(),
        _ => None,
    }
}

fn long_value(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(_) => as_uid(value),
        _ => number_long(value),
    }
}

/// Every stored form a filter value equals: an integral number and the
/// extended-JSON long of the same value. Other values stand for themselves.
pub(crate) fn stored_forms(value: &JsonValue) -> Vec<JsonValue> {
    match long_value(value) {
        Some(n) => vec![json!(n), json!({ "$numberLong": n.to_string() })],
        None => vec![value.clone()],
    }
}

/// Which fields a scan fetches per document. `_id` is always included.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    #[default]
    All,
    Include(Vec<String>),
}

impl Projection {
    pub fn all() -> Self {
        Projection::All
    }

    pub fn include<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Self {
        Projection::Include(paths.into_iter().map(Into::into).collect())
    }

    /// Top-level fields the projection touches, `_id` first.
    pub fn top_level_fields(&self) -> Option<Vec<String>> {
        match self {
            Projection::All => None,
            Projection::Include(paths) => {
                let mut fields = vec![ID_FIELD.to_string()];
                for path in paths {
                    let head = path.split('.').next().unwrap_or(path).to_string();
                    if !fields.contains(&head) {
                        fields.push(head);
                    }
                }
                Some(fields)
            }
        }
    }

    /// Returns a copy of the document holding only the projected fields.
    pub fn apply(&self, doc: &Document) -> Document {
        let paths = match self {
            Projection::All => return doc.clone(),
            Projection::Include(paths) => paths,
        };

        let mut out = JsonMap::new();
        if let Some(id) = doc.get(ID_FIELD) {
            out.insert(ID_FIELD.to_string(), id.clone());
        }
        for path in paths {
            if let Some(value) = doc.get_path(path) {
                insert_path(&mut out, path, value.clone());
            }
        }
        Document::from(out)
    }
}

/// Writes `value` at a dotted path, creating intermediate objects.
fn insert_path(target: &mut JsonMap, path: &str, value: JsonValue) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(JsonMap::new()));
            if let JsonValue::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: JsonValue) -> Document {
        Document::from_json(value).unwrap()
    }

    #[test]
    fn test_is_null_matches_missing_and_null() {
        let filter = Filter::is_null("jobId");

        assert!(filter.matches(&doc(json!({"_id": "1"}))));
        assert!(filter.matches(&doc(json!({"_id": "2", "jobId": null}))));
        assert!(!filter.matches(&doc(json!({"_id": "3", "jobId": ""}))));
    }

    #[test]
    fn test_exists_treats_null_as_present() {
        let d = doc(json!({"_id": "1", "jobId": null}));

        assert!(Filter::exists("jobId", true).matches(&d));
        assert!(!Filter::exists("jobId", false).matches(&d));
    }

    #[test]
    fn test_eq_compares_numbers_by_value() {
        let filter = Filter::eq("_individualUid", -1);

        assert!(filter.matches(&doc(json!({"_id": "s1", "_individualUid": -1}))));
        assert!(filter.matches(&doc(json!({"_id": "s2", "_individualUid": -1.0}))));
        assert!(!filter.matches(&doc(json!({"_id": "s3", "_individualUid": "-1"}))));
    }

    #[test]
    fn test_numbers_match_extended_json_longs() {
        let stored = doc(json!({"_id": "i7", "uid": {"$numberLong": "7"}}));

        assert!(Filter::eq("uid", 7).matches(&stored));
        assert!(Filter::is_in("uid", [3, 7]).matches(&stored));
        assert!(!Filter::eq("uid", 8).matches(&stored));
        assert!(!Filter::eq("uid", "7").matches(&stored));
        assert!(values_equal(&json!({"$numberLong": "07"}), &json!({"$numberLong": "7"})));
        assert!(!values_equal(
            &json!({"$numberLong": "7", "note": "x"}),
            &json!(7)
        ));
    }

    #[test]
    fn test_stored_forms() {
        assert_eq!(stored_forms(&json!(7)), vec![json!(7), json!({"$numberLong": "7"})]);
        assert_eq!(stored_forms(&json!(-1.0)), vec![json!(-1), json!({"$numberLong": "-1"})]);
        assert_eq!(stored_forms(&json!("IND7")), vec![json!("IND7")]);
        assert_eq!(stored_forms(&json!(1.5)), vec![json!(1.5)]);
    }

    #[test]
    fn test_in_and_nested_paths() {
        let d = doc(json!({"_id": "c1", "family": {"uid": 3}}));

        assert!(Filter::is_in("family.uid", [1, 2, 3]).matches(&d));
        assert!(!Filter::is_in("family.uid", [4]).matches(&d));
    }

    #[test]
    fn test_and_or() {
        let d = doc(json!({"_id": "f1", "uid": 10, "jobId": ""}));

        assert!(Filter::and(vec![Filter::eq("uid", 10), Filter::eq("jobId", "")]).matches(&d));
        assert!(!Filter::and(vec![Filter::eq("uid", 10), Filter::is_null("jobId")]).matches(&d));
        assert!(Filter::or(vec![Filter::eq("uid", 11), Filter::eq("jobId", "")]).matches(&d));
        assert!(Filter::and(vec![]).matches(&d));
    }

    #[test]
    fn test_projection_keeps_id_and_nested_paths() {
        let d = doc(json!({
            "_id": "c1",
            "family": {"id": "FAM1", "members": [1]},
            "proband": {"id": "P1"},
            "status": "READY"
        }));

        let projected = Projection::include(["family.id", "proband"]).apply(&d);

        assert_eq!(
            projected.into_json(),
            json!({"_id": "c1", "family": {"id": "FAM1"}, "proband": {"id": "P1"}})
        );
    }

    #[test]
    fn test_projection_top_level_fields() {
        let projection = Projection::include(["family.members", "family.id", "proband"]);

        assert_eq!(
            projection.top_level_fields().unwrap(),
            vec!["_id", "family", "proband"]
        );
        assert!(Projection::all().top_level_fields().is_none());
    }
}
