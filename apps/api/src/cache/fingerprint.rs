//! Deterministic cache keys for generation inputs.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON of `{operation, args}`.
///
/// Object keys serialize in sorted order, so two argument maps with the same
/// entries always hash identically. Unordered lists must go through
/// [`canonical_list`] before they are passed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    operation: String,
    digest: String,
}

impl Fingerprint {
    pub fn new(operation: &str, args: &impl Serialize) -> Result<Self, serde_json::Error> {
        let args = serde_json::to_value(args)?;
        let canonical = serde_json::to_string(&serde_json::json!({
            "operation": operation,
            "args": sort_object_keys(args),
        }))?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());

        Ok(Self {
            operation: operation.to_string(),
            digest: format!("{:x}", hasher.finalize()),
        })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.digest)
    }
}

/// Sorted copy of an order-insensitive list (features, keyword candidates).
pub fn canonical_list<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = items.iter().map(|s| s.as_ref().trim().to_string()).collect();
    sorted.sort();
    sorted
}

// serde_json's Map is a BTreeMap without `preserve_order`; rebuilding makes the
// ordering explicit for nested values too.
fn sort_object_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_object_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_object_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_inputs_same_digest() {
        let a = Fingerprint::new("title", &json!({"keyword": "ゲーム", "app": "Quest"})).unwrap();
        let b = Fingerprint::new("title", &json!({"app": "Quest", "keyword": "ゲーム"})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), "title:".len() + 64);
    }

    #[test]
    fn test_operation_is_part_of_the_key() {
        let args = json!({"keyword": "fitness"});
        let a = Fingerprint::new("title", &args).unwrap();
        let b = Fingerprint::new("subtitle", &args).unwrap();
        assert_eq!(a.to_string().split_once(':').unwrap().0, "title");
        assert_ne!(
            a.to_string().split_once(':').unwrap().1,
            b.to_string().split_once(':').unwrap().1
        );
    }

    #[test]
    fn test_canonical_list_ignores_input_order() {
        let a = Fingerprint::new("d", &json!({"features": canonical_list(&["b", "a"])})).unwrap();
        let b = Fingerprint::new("d", &json!({"features": canonical_list(&["a", " b"])})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_includes_operation() {
        let fp = Fingerprint::new("whats_new", &json!({})).unwrap();
        assert!(fp.to_string().starts_with("whats_new:"));
    }
}
