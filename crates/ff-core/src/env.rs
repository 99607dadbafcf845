use serde_json::Value as Json;

use crate::value::Value;

// ---------------------------------------------------------------------------
// Environment adapter
// ---------------------------------------------------------------------------

/// Look up `key` in the environment object and coerce the result onto the
/// typed [`Value`] domain.
///
/// A missing key, a JSON `null`, and a top-level object all map to
/// [`Value::Null`]. A top-level array becomes a flat [`Value::List`]: its
/// scalar elements are coerced in order and nested arrays/objects are
/// dropped, so the predicates downstream always see flat, typed collections.
pub(crate) fn lookup(env: &Json, key: &str) -> Value {
    match env.get(key) {
        None => Value::Null,
        Some(Json::Array(items)) => Value::List(items.iter().filter_map(scalar).collect()),
        Some(Json::Object(_)) => Value::Null,
        Some(other) => scalar(other).unwrap_or(Value::Null),
    }
}

/// Coerce one scalar JSON value; composites yield `None` and are dropped
/// from containing lists.
fn scalar(v: &Json) -> Option<Value> {
    match v {
        Json::Null => Some(Value::Null),
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => {
            // The JSON token shape decides: integral syntax stays Int,
            // fractional syntax becomes Float.
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        Json::String(s) => Some(Value::Str(s.clone())),
        Json::Array(_) | Json::Object(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
