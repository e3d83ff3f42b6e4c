use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::expand::Selection;

/// Fields that describe a pattern without distinguishing it.
const DESCRIPTIVE_FIELDS: [&str; 2] = ["name", "description"];
const COMMENT_PREFIX: &str = "//";

fn is_ignored(field: &str) -> bool {
    DESCRIPTIVE_FIELDS.contains(&field) || field.starts_with(COMMENT_PREFIX)
}

/// Canonical form of a selection used for exclusion matching: descriptive
/// and comment fields dropped, keys sorted, compact JSON.
pub fn exclusion_key(selection: &Selection) -> String {
    let sorted: BTreeMap<&String, &Value> = selection
        .iter()
        .filter(|(field, _)| !is_ignored(field))
        .collect();
    let normalized: Map<String, Value> = sorted
        .into_iter()
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    Value::Object(normalized).to_string()
}

/// Normalized selections declared by suppress leaves.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    keys: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equivalent selection was already present.
    pub fn insert(&mut self, selection: &Selection) -> bool {
        self.keys.insert(exclusion_key(selection))
    }

    pub fn contains(&self, selection: &Selection) -> bool {
        self.keys.contains(&exclusion_key(selection))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn selection(value: Value) -> Selection {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn key_ignores_order_names_and_comments() {
        let left = selection(json!({"name": "a", "color": "red", "fruit": "lemon"}));
        let right = selection(json!({
            "fruit": "lemon",
            "// note": "ignored",
            "description": "other",
            "color": "red"
        }));

        assert_eq!(exclusion_key(&left), r#"{"color":"red","fruit":"lemon"}"#);
        assert_eq!(exclusion_key(&left), exclusion_key(&right));
    }

    #[test]
    fn insertion_is_idempotent() {
        let mut set = ExclusionSet::new();
        let excluded = selection(json!({"name": "x", "color": "red"}));
        assert!(set.is_empty());

        assert!(set.insert(&excluded));
        assert!(!set.insert(&selection(json!({"color": "red", "name": "y"}))));
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
        assert!(set.contains(&selection(json!({"color": "red"}))));
        assert!(!set.contains(&selection(json!({"color": "green"}))));
    }
}
