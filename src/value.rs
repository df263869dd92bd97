//! Data values bound into documents.

use serde_json::{Number, Value};

/// Display form of a bound value. Absent and null values display as nothing.
pub fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => display_number(n),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}

/// Integral floats print without a fraction (`1.0` displays as `1`).
fn display_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f + 0.0),
        _ => n.to_string(),
    }
}

/// Split a binding path into lookup segments. `?` markers are dropped.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('.').map(|s| s.trim_end_matches('?')).collect()
}

/// Look `key` up as an own member of `value`. Sequences take numeric keys.
pub fn member<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Resolve `segments` against one data object. Every non-final hop must land
/// on something non-null; the final segment must be an own member.
pub fn lookup<'v>(data: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    let (last, init) = segments.split_last()?;
    let mut current = data;
    for segment in init {
        current = member(current, segment).filter(|v| !v.is_null())?;
    }
    member(current, last)
}

/// Items of a bound collection, in iteration order. Mappings yield their
/// values in insertion order; anything else is not a collection.
pub fn items(value: Option<Value>) -> Option<Vec<Value>> {
    match value? {
        Value::Array(items) => Some(items),
        Value::Object(map) => Some(map.into_iter().map(|(_, v)| v).collect()),
        _ => None,
    }
}
