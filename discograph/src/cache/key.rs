//! Canonical cache key construction.

use serde_json::Value;

/// Builds a deterministic cache key from a namespace and a parameter record.
///
/// The parameter record is serialized with recursively sorted object keys,
/// so the key is independent of field order:
/// `{"a":1,"b":2}` and `{"b":2,"a":1}` produce the same key.
pub fn canonical_key(namespace: &str, params: &Value) -> String {
    let mut out = String::with_capacity(namespace.len() + 32);
    out.push_str(namespace);
    out.push(':');
    write_canonical(params, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Quote and escape the key like any JSON string
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
