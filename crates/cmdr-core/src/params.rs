//! Parameter and option maps
//!
//! Parameters and options are both carried as `ParamMap`, a sorted map of
//! JSON values. Sorting makes the serialized form canonical, which is what
//! the store's `(name, parameters)` uniqueness constraint relies on.

use serde_json::Value;
use std::collections::BTreeMap;

/// Key-value map of command parameters or options
pub type ParamMap = BTreeMap<String, Value>;

/// Option keys that describe how the framework invoked a command rather
/// than how the command should run. They are never persisted on a log.
pub const INTERNAL_OPTIONS: &[&str] = &["dispatched", "interactive"];

/// Serialize a map to its canonical JSON form
///
/// Keys are emitted in sorted order at every nesting level.
pub fn canonical_json(map: &ParamMap) -> String {
    // BTreeMap and serde_json's default Map both iterate in key order.
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a canonical JSON map back; malformed input yields an empty map
pub fn parse_map(json: &str) -> ParamMap {
    serde_json::from_str(json).unwrap_or_default()
}

/// Options with framework-internal keys removed
pub fn loggable_options(options: &ParamMap) -> ParamMap {
    options
        .iter()
        .filter(|(k, _)| !INTERNAL_OPTIONS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Render a value the way it appears on a command line
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a stored parameter satisfies an expected dependency value
///
/// Values match when equal as JSON, or when their command-line renderings
/// are equal (so `"5"` matches `5`).
pub fn value_matches(stored: &Value, expected: &Value) -> bool {
    stored == expected || render_value(stored) == render_value(expected)
}

/// Whether a unit or download result carries no data
///
/// `null`, and arrays or objects whose members are all `null`, are empty.
/// An empty array or object is also empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().all(Value::is_null),
        Value::Object(fields) => fields.values().all(Value::is_null),
        _ => false,
    }
}

/// Read a boolean flag; absent or non-boolean values read as false
pub fn flag(map: &ParamMap, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}
