//! Key normalization for storage-safe profile documents.
//!
//! Document stores reserve `.` inside keys (path separator) and a leading
//! `$` (operators). Every such key is rewritten with `_`, recursively.

use serde_json::{Map, Value};

/// Leading character document stores reserve for operators.
pub const RESERVED_PREFIX: char = '$';

/// Rewrite a single key. Returns `None` when the key is already clean.
pub fn normalize_key(key: &str) -> Option<String> {
    let dotted = key.contains('.');
    let reserved = key.starts_with(RESERVED_PREFIX);
    if !dotted && !reserved {
        return None;
    }

    let mut out = key.replace('.', "_");
    if reserved {
        out.replace_range(..RESERVED_PREFIX.len_utf8(), "_");
    }
    Some(out)
}

/// Normalize every key of a document, building a new document.
///
/// Nested objects and objects inside arrays are normalized as well;
/// primitive values are kept as-is. When a rewritten key collides with a
/// key that was already clean, the clean key keeps its value.
pub fn normalize_document(doc: Value) -> Value {
    match doc {
        Value::Object(map) => Value::Object(normalize_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_document).collect()),
        other => other,
    }
}

fn normalize_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    let mut renamed = Vec::new();

    for (key, value) in map {
        let value = normalize_document(value);
        match normalize_key(&key) {
            None => {
                out.insert(key, value);
            }
            Some(new_key) => renamed.push((new_key, value)),
        }
    }

    for (key, value) in renamed {
        out.entry(key).or_insert(value);
    }

    out
}
