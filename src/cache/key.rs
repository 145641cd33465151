//! Cache Key Module
//!
//! Deterministic key generation from a resource type and a parameter set.

use serde_json::{Map, Value};

/// Resource type used for keys produced by the fetch coordinator.
pub const FETCH_RESOURCE: &str = "fetch";

// == Generate Key ==
/// Builds a cache key as `{resource_type}_{params}`.
///
/// `params` is serialized as compact JSON with object keys in lexicographic
/// order at every nesting level, so the same pairs produce the same key no
/// matter the insertion order. Empty params still yield `{resource_type}_{}`.
pub fn generate_key<'a, I>(resource_type: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let params: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    format!("{}_{}", resource_type, canonical(&Value::Object(params)))
}

/// Rebuilds nested objects so their keys serialize in sorted order even when
/// serde_json is compiled with `preserve_order`.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_is_order_independent() {
        let a = json!(1);
        let b = json!("two");
        let first = generate_key("assets", [("page", &a), ("sort", &b)]);
        let second = generate_key("assets", [("sort", &b), ("page", &a)]);
        assert_eq!(first, second);
        assert_eq!(first, r#"assets_{"page":1,"sort":"two"}"#);
    }

    #[test]
    fn test_empty_params_keep_resource_type() {
        let empty: [(&str, &Value); 0] = [];
        assert_eq!(generate_key("stats", empty), "stats_{}");
        assert_ne!(generate_key("stats", empty), generate_key("assets", empty));
    }

    #[test]
    fn test_distinct_params_give_distinct_keys() {
        let one = json!(1);
        let two = json!(2);
        assert_ne!(
            generate_key("assets", [("page", &one)]),
            generate_key("assets", [("page", &two)])
        );
        assert_ne!(
            generate_key("assets", [("page", &one)]),
            generate_key("assets", [("limit", &one)])
        );
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let headers_a = json!({"b": "2", "a": "1"});
        let headers_b = json!({"a": "1", "b": "2"});
        assert_eq!(
            generate_key("fetch", [("headers", &headers_a)]),
            generate_key("fetch", [("headers", &headers_b)])
        );
    }

    #[test]
    fn test_string_and_number_values_differ() {
        let number = json!(1);
        let text = json!("1");
        assert_ne!(
            generate_key("assets", [("page", &number)]),
            generate_key("assets", [("page", &text)])
        );
    }
}
