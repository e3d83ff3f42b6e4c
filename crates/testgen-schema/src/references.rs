use serde_json::{Map, Value};
use testgen_core::SchemaError;

/// A parsed `@name[/sub]` or `#@name[/sub]` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceToken<'a> {
    /// `@name`: the referenced value itself.
    Values(&'a str),
    /// `#@name`: the key set of the referenced mapping.
    Keys(&'a str),
}

impl<'a> ReferenceToken<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        if let Some(target) = raw.strip_prefix("#@") {
            Some(Self::Keys(target))
        } else {
            raw.strip_prefix('@').map(Self::Values)
        }
    }

    pub fn target(&self) -> &'a str {
        match self {
            Self::Values(target) | Self::Keys(target) => target,
        }
    }
}

/// Global named references declared with `#name` schema keys.
///
/// Filled while the schema is compiled and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    entries: Map<String, Value>,
}

impl ReferenceTable {
    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.entries.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a token to its value, or to the list of its keys for the
    /// `#@` form.
    pub fn resolve(&self, token: ReferenceToken<'_>) -> Result<Value, SchemaError> {
        let target = token.target();
        let invalid = || SchemaError::InvalidReference(target.to_string());

        let mut parts = target.split('/').filter(|part| !part.is_empty());
        let name = parts.next().ok_or_else(invalid)?;
        let mut current = self.entries.get(name).ok_or_else(invalid)?;
        for part in parts {
            current = current
                .as_object()
                .and_then(|map| map.get(part))
                .ok_or_else(invalid)?;
        }

        match token {
            ReferenceToken::Values(_) => Ok(current.clone()),
            ReferenceToken::Keys(_) => {
                let map = current.as_object().ok_or_else(invalid)?;
                Ok(Value::Array(
                    map.keys().map(|key| Value::String(key.clone())).collect(),
                ))
            }
        }
    }
}
