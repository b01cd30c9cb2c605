//! Deep structural equality over JSON values.
//!
//! The controller needs to decide whether the current filters differ from
//! the configuration baseline (`has_active_filters`) and whether a new
//! configuration actually changes the query. Both use a pure recursive
//! structural comparison over ordered sequences and key-value mappings,
//! independent of any host runtime's identity semantics.

use serde_json::Value;

/// Recursively compares two JSON values for structural equality.
///
/// Arrays compare element-wise in order; objects compare by key set and
/// per-key value, ignoring key order. Numbers compare by value.
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Compares two filter mappings for structural equality.
#[must_use]
pub fn filters_equal(
    a: &std::collections::BTreeMap<String, Value>,
    b: &std::collections::BTreeMap<String, Value>,
) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, x)| b.get(key).is_some_and(|y| deep_equal(x, y)))
}
