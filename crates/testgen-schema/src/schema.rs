use jsonschema::JSONSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;
use testgen_core::{SchemaError, TreePath};

use crate::model::WhenRule;

/// Emit the JSON Schema for a leaf's `when` block.
pub fn when_json_schema() -> RootSchema {
    schema_for!(Vec<WhenRule>)
}

/// Structurally check a raw `when` block and decode it.
pub fn parse_when_rules(raw: &Value, path: &TreePath) -> Result<Vec<WhenRule>, SchemaError> {
    let invalid = |message: String| SchemaError::InvalidWhen {
        path: path.to_string(),
        message,
    };

    let schema = serde_json::to_value(when_json_schema()).map_err(|err| invalid(err.to_string()))?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| invalid(err.to_string()))?;

    if let Err(errors) = compiled.validate(raw) {
        let issues: Vec<String> = errors
            .map(|error| {
                format!(
                    "{}: {}",
                    normalized_json_pointer(&error.instance_path.to_string()),
                    error
                )
            })
            .collect();
        return Err(invalid(issues.join("; ")));
    }

    serde_json::from_value(raw.clone()).map_err(|err| invalid(err.to_string()))
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{DoAction, TemplateSource};

    #[test]
    fn accepts_well_formed_rules() {
        let raw = json!([{
            "match_any": [["%(color)s", "yellow"]],
            "do": [
                {"action": "set_extension", "key": "ext", "template": "headers"},
                {"action": "generate", "path": "%(color)s.%(ext)s", "template": "x"}
            ]
        }]);
        let rules = parse_when_rules(&raw, &TreePath::root()).expect("valid when rules");

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].match_any[0][1], "yellow");
        assert_eq!(
            rules[0].actions[1],
            DoAction::Generate {
                path: "%(color)s.%(ext)s".to_string(),
                template: TemplateSource::Inline("x".to_string()),
            }
        );
    }

    #[test]
    fn rejects_pairs_of_wrong_arity() {
        let raw = json!([{"match_any": [["a", "b", "c"]], "do": []}]);
        let err = parse_when_rules(&raw, &TreePath::parse("/leaf")).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidWhen { ref path, .. } if path == "/leaf"));
    }

    #[test]
    fn rejects_unknown_actions() {
        let raw = json!([{"match_any": [], "do": [{"action": "explode"}]}]);
        assert!(parse_when_rules(&raw, &TreePath::root()).is_err());
    }
}
