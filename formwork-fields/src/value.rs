//! Helpers for inspecting stored values.

use serde_json::Value;

/// Whether a value counts as "not filled in".
///
/// Absent values, `null`, the empty string, and empty arrays and objects are
/// blank. `false` and `0` are real answers and are not.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

/// String form used for loose comparisons: strings as-is, `null` as empty.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare two values the way form conditions do: `"1"` equals `1` and
/// `"true"` equals `true`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    a == b || as_text(a) == as_text(b)
}
