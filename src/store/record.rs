//! Record representation and primary-key handling
//!
//! A record is an ordered map from field name to JSON value. The store never
//! interprets field values beyond the primary and foreign keys, both of which
//! must be strings or numbers.
//!
//! Primary keys are canonicalized to index strings so that the number `1` and
//! the path segment `"1"` a REST layer extracts address the same record.

use serde_json::{Map, Value};

/// A single schema-less record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Canonical index string for a key value.
///
/// Strings canonicalize to themselves, numbers to their decimal rendering.
/// Returns `None` for any other JSON type; such values are rejected as keys.
pub fn key_index_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether two key values address the same record.
pub fn keys_equal(a: &Value, b: &Value) -> bool {
    match (key_index_string(a), key_index_string(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Merge `properties` over `record`, field by field.
///
/// Supplied fields replace existing values wholesale; fields absent from
/// `properties` are left untouched. Nested objects are not merged recursively.
pub fn merge_properties(record: &mut Record, properties: Record) {
    for (field, value) in properties {
        record.insert(field, value);
    }
}
