//! Content hashing utilities.

use serde_json::Value;
use xxhash_rust::xxh3::xxh3_64;

/// Compute a content hash for arbitrary bytes
pub fn content_hash(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Hash of a JSON value that ignores object key order.
pub fn json_fingerprint(value: &Value) -> u64 {
    content_hash(canonical_json(value).as_bytes())
}

/// JSON text with object keys sorted.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
