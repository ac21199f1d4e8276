//! Field lookups over untyped webhook payloads.

use serde_json::Value;

/// Non-empty string at a JSON pointer.
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Id of an expandable reference: either `"sub_123"` or `{"id": "sub_123", ...}`.
pub fn expandable_id<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim()),
        obj @ Value::Object(_) => str_at(obj, "/id"),
        _ => None,
    }
}

/// First present non-negative integer field, in the given priority order.
pub fn first_non_negative_i64(value: &Value, pointers: &[&str]) -> Option<i64> {
    pointers
        .iter()
        .filter_map(|p| value.pointer(p).and_then(Value::as_i64))
        .find(|n| *n >= 0)
}

pub fn first_f64(value: &Value, pointers: &[&str]) -> Option<f64> {
    pointers
        .iter()
        .find_map(|p| value.pointer(p).and_then(Value::as_f64))
}

/// Id fields arrive as numbers from some gateways and strings from others.
pub fn id_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
