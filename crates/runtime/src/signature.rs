//! Canonical signatures for duplicate detection.
//!
//! A signature identifies a tool invocation independently of JSON key order
//! and whitespace, so `{"b":1,"a":2}` and `{ "a": 2, "b": 1 }` collide.

use crate::tools::AssembledToolCall;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Build the signature for a tool invocation.
///
/// Returns `None` when `params` is not a JSON object: such a call cannot be
/// compared against earlier ones, which is different from being new.
pub fn build_signature(tool_name: &str, params: &Value, scope: &str) -> Option<String> {
    let Value::Object(_) = params else {
        return None;
    };
    let action = params
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let canonical = canonicalize_json_value(params).to_string();
    Some(format!(
        "{scope}:{tool_name}:{action}:{}",
        sha256_hex(canonical.as_bytes())
    ))
}

/// Build the signature for an assembled call from its raw argument string.
///
/// An empty argument string is read as `{}`. Invalid JSON yields `None`.
pub fn signature_for_call(call: &AssembledToolCall, scope: &str) -> Option<String> {
    let raw = call.arguments.trim();
    let params = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).ok()?
    };
    build_signature(&call.name, &params, scope)
}

/// Recursively sort object keys.
pub fn canonicalize_json_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut out = Map::with_capacity(entries.len());
            for (key, child) in entries {
                out.insert(key.clone(), canonicalize_json_value(child));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_json_value).collect()),
        _ => value.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
