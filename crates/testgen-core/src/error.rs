use thiserror::Error;

/// Defect in the rule tree itself.
///
/// A schema error always points at a tooling or authoring bug in the schema,
/// never at the specification data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A schema key that is neither a node, an assertion, a reference, nor a
    /// leaf marker.
    #[error("Invalid key '{key}' in schema at '{path}'")]
    InvalidKey { key: String, path: String },
    /// A `@name[/sub]` or `#@name[/sub]` token that does not resolve.
    #[error("Invalid reference '{0}'")]
    InvalidReference(String),
    /// A predicate name outside the supported set.
    #[error("Non-existing assertion method \"{0}\"")]
    UnknownPredicate(String),
    #[error("Schema \"matches\" operator expects a dict or schema reference, got '{0}'")]
    MatchesNotDict(String),
    #[error("Schema \"{kind}\" operator at '{path}' has an invalid expectation: {message}")]
    InvalidExpectation {
        kind: String,
        path: String,
        message: String,
    },
    #[error("Invalid leaf marker \"{marker}\" at '{path}': {message}")]
    InvalidMarker {
        marker: String,
        path: String,
        message: String,
    },
    #[error("Invalid \"when\" rules at '{path}': {message}")]
    InvalidWhen { path: String, message: String },
    /// A template that fails to render against its selection.
    #[error("Failed to render template '{template}': {cause}")]
    Template { template: String, cause: String },
}

/// The concrete reason a specification fails an otherwise valid rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Must contain field \"{0}\"")]
    MissingField(String),
    #[error("Unexpected field \"{0}\".")]
    UnexpectedField(String),
    #[error("Field \"{0}\" must be a string")]
    NotString(String),
    #[error("Field \"{0}\" must not be empty")]
    EmptyString(String),
    #[error("\"{0}\" must be a list")]
    NotList(String),
    #[error("List \"{0}\" must not be empty")]
    EmptyList(String),
    #[error("\"{0}\" must be a dict")]
    NotDict(String),
    #[error("Dict \"{0}\" must not be empty")]
    EmptyDict(String),
    #[error("Field \"{0}\" must be an integer")]
    NotInteger(String),
    #[error("Field \"{field}\" must name an existing file, got '{value}'")]
    MissingFile { field: String, value: String },
    #[error("Field \"{field}\" must be from: {allowed}")]
    NotAllowed { field: String, allowed: String },
    #[error("Field \"{0}\": wildcard is not supported for lists")]
    WildcardInList(String),
    #[error("Value must be a dict, got {0}")]
    ExpectedDict(String),
    #[error("Value must be a list or dict, got {0}")]
    ExpectedContainer(String),
    #[error("No schema rule for path \"{0}\"")]
    NoRule(String),
    #[error("Value at schema path \"{0}\" must be a dict")]
    SchemaNodeNotDict(String),
    #[error("Pattern at \"{0}\" must be a dict")]
    PatternNotDict(String),
}

/// Specification content that violates the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{violation} (at \"{path}\")")]
pub struct SpecError {
    /// Concrete path of the offending value.
    pub path: String,
    pub violation: Violation,
}

impl SpecError {
    pub fn new(path: impl Into<String>, violation: Violation) -> Self {
        Self {
            path: path.into(),
            violation,
        }
    }
}

/// Error returned by the rule engine; keeps the two kinds apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
}

impl Error {
    /// Returns true when the schema, not the specification, is at fault.
    pub fn is_schema_defect(&self) -> bool {
        matches!(self, Error::Schema(_))
    }
}

/// Convenience alias for results returned by testgen crates.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_stay_separate() {
        let schema: Error = SchemaError::InvalidReference("colors".to_string()).into();
        let spec: Error = SpecError::new("/a", Violation::MissingField("name".to_string())).into();

        assert!(schema.is_schema_defect());
        assert!(!spec.is_schema_defect());
        assert_eq!(
            spec.to_string(),
            "spec error: Must contain field \"name\" (at \"/a\")"
        );
    }
}
