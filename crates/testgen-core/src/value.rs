use serde_json::Value;

use crate::path::Segment;

/// Token that stands for "every value of this field's domain".
pub const WILDCARD: &str = "*";

pub fn is_wildcard(value: &Value) -> bool {
    value.as_str() == Some(WILDCARD)
}

pub fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Children of a mapping or sequence, keyed by path segment.
///
/// Scalars have no children.
pub fn entries(value: &Value) -> Vec<(Segment, &Value)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, child)| (Segment::key(key), child))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, child)| (Segment::Index(index), child))
            .collect(),
        _ => Vec::new(),
    }
}

/// Text form used for template substitution and diagnostics: strings are
/// emitted raw, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entries_follow_document_order() {
        let value = json!({"b": 1, "a": [true, false]});
        let keys: Vec<String> = entries(&value)
            .into_iter()
            .map(|(segment, _)| segment.to_string())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);

        let indices: Vec<String> = entries(&value["a"])
            .into_iter()
            .map(|(segment, _)| segment.to_string())
            .collect();
        assert_eq!(indices, vec!["0", "1"]);
    }

    #[test]
    fn display_value_keeps_strings_raw() {
        assert_eq!(display_value(&json!("red")), "red");
        assert_eq!(display_value(&json!(7)), "7");
        assert_eq!(display_value(&json!(["a"])), "[\"a\"]");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&Value::Null), "null");
        assert!(is_wildcard(&json!("*")));
        assert!(!is_wildcard(&json!(["*"])));
    }
}
