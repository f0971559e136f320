//! Reduces a script value tree to a JSON-safe subset.
//!
//! `None` means "omitted": the caller drops the element or key holding it.

use crate::value::ScriptValue;
use serde_json::{Map, Number, Value};

/// Keys that point into the inheritance chain. At the top level such a key is dropped; any
/// nested object or array holding one, at any depth, is omitted as a whole.
pub const DENIED_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

pub fn sanitize(value: &ScriptValue) -> Option<Value> {
    match value {
        ScriptValue::Null => Some(Value::Null),
        ScriptValue::Bool(b) => Some(Value::Bool(*b)),
        ScriptValue::Number(n) => number(*n).map(Value::Number),
        ScriptValue::String(s) => Some(Value::String(s.clone())),
        ScriptValue::Array(items) => Some(Value::Array(
            items.iter().filter_map(nested).collect(),
        )),
        ScriptValue::Object(entries) => {
            let mut safe = Map::new();
            for (key, item) in entries {
                if DENIED_KEYS.contains(&key.as_str()) {
                    tracing::debug!(key = %key, "dropping denied key from script result");
                    continue;
                }
                if let Some(item) = nested(item) {
                    safe.insert(key.clone(), item);
                }
            }
            (!safe.is_empty()).then_some(Value::Object(safe))
        }
        ScriptValue::Undefined | ScriptValue::Opaque(_) => None,
    }
}

/// A value below the top level is kept only if nothing inside it carries a denied key.
fn nested(value: &ScriptValue) -> Option<Value> {
    if holds_denied_key(value) {
        tracing::debug!(kind = value.kind(), "dropping value holding a denied key");
        return None;
    }
    sanitize(value)
}

fn holds_denied_key(value: &ScriptValue) -> bool {
    match value {
        ScriptValue::Object(entries) => entries
            .iter()
            .any(|(key, item)| DENIED_KEYS.contains(&key.as_str()) || holds_denied_key(item)),
        ScriptValue::Array(items) => items.iter().any(holds_denied_key),
        _ => false,
    }
}

/// Integral values become JSON integers so `42` does not turn into `42.0`.
fn number(n: f64) -> Option<Number> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        return Some(Number::from(n as i64));
    }
    Number::from_f64(n)
}
