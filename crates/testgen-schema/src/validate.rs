use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use testgen_core::{
    Result, Segment, SpecError, TreePath, Violation, display_value, entries, is_container,
    is_wildcard, type_name,
};
use tracing::debug;

use crate::compile::{CompiledSchema, compile_schema};
use crate::model::{Assertion, CompiledRule, FieldRule, Predicate};

/// Last path, value, and expectation the validator looked at.
///
/// Filled in as validation walks the tree, so on failure it describes the
/// point of failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorDetails {
    pub path: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation: Option<Value>,
}

/// Compile `schema` and validate `spec` against it.
///
/// Returns the compiled schema so that generation can reuse its tables.
pub fn validate_spec(
    spec: &Value,
    schema: &Value,
    details: &mut ErrorDetails,
) -> Result<CompiledSchema> {
    let compiled = compile_schema(schema)?;
    Validator::new(&compiled).validate(spec, details)?;
    Ok(compiled)
}

/// Walks a specification in lock-step with a compiled schema.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a CompiledSchema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a CompiledSchema) -> Self {
        Self { schema }
    }

    pub fn validate(
        &self,
        spec: &Value,
        details: &mut ErrorDetails,
    ) -> std::result::Result<(), SpecError> {
        if !is_container(spec) {
            details.path = TreePath::root().to_string();
            details.value = spec.clone();
            return Err(SpecError::new(
                TreePath::root().to_string(),
                Violation::ExpectedContainer(type_name(spec).to_string()),
            ));
        }
        self.visit(spec, &TreePath::root(), details)?;
        debug!("specification validated");
        Ok(())
    }

    fn visit(
        &self,
        value: &Value,
        path: &TreePath,
        details: &mut ErrorDetails,
    ) -> std::result::Result<(), SpecError> {
        details.path = path.to_string();
        details.value = value.clone();

        let rules: &[CompiledRule] = match self.schema.rules_at(&path.generalize()) {
            Some(rules) => rules,
            None if path.is_root() => &[],
            None => {
                return Err(SpecError::new(
                    path.to_string(),
                    Violation::NoRule(path.to_string()),
                ));
            }
        };

        for rule in rules {
            details.expectation = Some(rule.expectation.clone());
            check_assertion(&rule.assertion, value)
                .map_err(|violation| SpecError::new(path.to_string(), violation))?;
        }

        for (segment, child) in entries(value) {
            if !is_container(child) {
                continue;
            }
            let child_path = path.child(segment.clone());
            if self.schema.rules_at(&child_path.generalize()).is_none()
                && checked_by_parent(rules, &segment)
            {
                continue;
            }
            self.visit(child, &child_path, details)?;
        }

        Ok(())
    }
}

/// A container child without its own schema node is acceptable when a field
/// predicate of the parent already checked its content.
fn checked_by_parent(rules: &[CompiledRule], segment: &Segment) -> bool {
    rules.iter().any(|rule| match &rule.assertion {
        Assertion::Matches(fields) => match segment {
            Segment::Key(key) => fields.iter().any(|field| &field.name == key),
            _ => false,
        },
        Assertion::EachValue(_) => true,
        Assertion::HasKeys(_) => false,
    })
}

fn check_assertion(assertion: &Assertion, value: &Value) -> std::result::Result<(), Violation> {
    match assertion {
        Assertion::Matches(fields) => check_fields(fields, value),
        Assertion::HasKeys(keys) => {
            let map = expect_dict(value)?;
            check_exact_keys(map, keys.iter().map(String::as_str))
        }
        Assertion::EachValue(predicate) => match value {
            Value::Object(map) => map
                .iter()
                .try_for_each(|(key, item)| check_predicate(predicate, key, item)),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(index, item)| {
                    check_predicate(predicate, &index.to_string(), item)
                }),
            other => Err(Violation::ExpectedContainer(type_name(other).to_string())),
        },
    }
}

fn check_fields(fields: &[FieldRule], value: &Value) -> std::result::Result<(), Violation> {
    let map = expect_dict(value)?;
    check_exact_keys(map, fields.iter().map(|field| field.name.as_str()))?;
    for field in fields {
        if let Some(item) = map.get(&field.name) {
            check_predicate(&field.predicate, &field.name, item)?;
        }
    }
    Ok(())
}

fn expect_dict(value: &Value) -> std::result::Result<&Map<String, Value>, Violation> {
    value
        .as_object()
        .ok_or_else(|| Violation::ExpectedDict(type_name(value).to_string()))
}

fn check_exact_keys<'k>(
    map: &Map<String, Value>,
    expected: impl Iterator<Item = &'k str> + Clone,
) -> std::result::Result<(), Violation> {
    for key in expected.clone() {
        if !map.contains_key(key) {
            return Err(Violation::MissingField(key.to_string()));
        }
    }
    for actual in map.keys() {
        if !expected.clone().any(|key| key == actual.as_str()) {
            return Err(Violation::UnexpectedField(actual.clone()));
        }
    }
    Ok(())
}

fn check_predicate(
    predicate: &Predicate,
    field: &str,
    value: &Value,
) -> std::result::Result<(), Violation> {
    match predicate {
        Predicate::NonEmptyString => match value.as_str() {
            None => Err(Violation::NotString(field.to_string())),
            Some("") => Err(Violation::EmptyString(field.to_string())),
            Some(_) => Ok(()),
        },
        Predicate::NonEmptyList => match value.as_array() {
            None => Err(Violation::NotList(field.to_string())),
            Some(items) if items.is_empty() => Err(Violation::EmptyList(field.to_string())),
            Some(_) => Ok(()),
        },
        Predicate::NonEmptyDict => match value.as_object() {
            None => Err(Violation::NotDict(field.to_string())),
            Some(map) if map.is_empty() => Err(Violation::EmptyDict(field.to_string())),
            Some(_) => Ok(()),
        },
        Predicate::Integer => {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err(Violation::NotInteger(field.to_string()))
            }
        }
        Predicate::ExistingFile => match value.as_str() {
            Some(path) if Path::new(path).is_file() => Ok(()),
            _ => Err(Violation::MissingFile {
                field: field.to_string(),
                value: display_value(value),
            }),
        },
        Predicate::OneOf(allowed) => check_membership(field, value, allowed),
        Predicate::Fields(fields) => check_fields(fields, value),
    }
}

/// The wildcard is a member of every allowed set, but only as a single value.
fn check_membership(
    field: &str,
    value: &Value,
    allowed: &[Value],
) -> std::result::Result<(), Violation> {
    let not_allowed = || Violation::NotAllowed {
        field: field.to_string(),
        allowed: allowed_display(allowed),
    };

    match value {
        Value::Array(items) => {
            for item in items {
                if is_wildcard(item) {
                    return Err(Violation::WildcardInList(field.to_string()));
                }
                if !allowed.contains(item) {
                    return Err(not_allowed());
                }
            }
            Ok(())
        }
        single if is_wildcard(single) || allowed.contains(single) => Ok(()),
        _ => Err(not_allowed()),
    }
}

fn allowed_display(allowed: &[Value]) -> String {
    let mut shown = vec![Value::String("*".to_string())];
    shown.extend(allowed.iter().filter(|value| !is_wildcard(value)).cloned());
    Value::Array(shown).to_string()
}
