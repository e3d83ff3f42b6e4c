use std::collections::BTreeMap;

use serde_json::{Map, Value};
use testgen_core::{Result, SchemaError, SpecError, TreePath, Violation, display_value, is_wildcard};
use tracing::debug;

use crate::model::{
    Assertion, AssertionKind, CompiledRule, FieldRule, LeafAction, LeafRule, Predicate,
    TemplateSource,
};
use crate::references::{ReferenceTable, ReferenceToken};
use crate::schema::parse_when_rules;

/// References may point at mappings whose fields are references again; this
/// bounds how deep that chain may go.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Rule tables produced from one schema document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSchema {
    rules: BTreeMap<TreePath, Vec<CompiledRule>>,
    references: ReferenceTable,
    leaves: BTreeMap<TreePath, LeafRule>,
    domains: BTreeMap<TreePath, Vec<Value>>,
}

impl CompiledSchema {
    /// Rules registered at a generalized path; `None` when the schema does not
    /// describe the path at all.
    pub fn rules_at(&self, path: &TreePath) -> Option<&[CompiledRule]> {
        self.rules.get(path).map(Vec::as_slice)
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn leaf(&self, path: &TreePath) -> Option<&LeafRule> {
        self.leaves.get(path)
    }

    pub fn is_leaf(&self, path: &TreePath) -> bool {
        self.leaves.contains_key(path)
    }

    pub fn leaves(&self) -> impl Iterator<Item = (&TreePath, &LeafRule)> {
        self.leaves.iter()
    }

    /// Allowed values of the field at `path`, used to expand a wildcard.
    pub fn domain(&self, path: &TreePath) -> Option<&[Value]> {
        self.domains.get(path).map(Vec::as_slice)
    }
}

/// Compile a schema tree into rule, reference, leaf, and domain tables.
pub fn compile_schema(schema: &Value) -> Result<CompiledSchema> {
    let mut raw = RawSchema::default();
    raw.walk(schema, &TreePath::root())?;
    let compiled = raw.lower()?;

    debug!(
        paths = compiled.rules.len(),
        references = compiled.references.len(),
        leaves = compiled.leaves.len(),
        domains = compiled.domains.len(),
        "schema compiled"
    );

    Ok(compiled)
}

/// First pass output: assertions keep their raw expectation until every
/// reference is known.
#[derive(Default)]
struct RawSchema {
    rules: BTreeMap<TreePath, Vec<(AssertionKind, Value)>>,
    references: ReferenceTable,
    leaves: BTreeMap<TreePath, LeafRule>,
}

impl RawSchema {
    fn walk(&mut self, node: &Value, path: &TreePath) -> Result<()> {
        let Some(map) = node.as_object() else {
            return Err(SpecError::new(
                path.to_string(),
                Violation::SchemaNodeNotDict(path.to_string()),
            )
            .into());
        };
        self.rules.entry(path.clone()).or_default();

        for (key, value) in map {
            if key.starts_with('/') {
                let next = path.join(&TreePath::parse(key));
                self.register_prefixes(path, &next);
                self.walk(value, &next)?;
            } else if let Some(kind) = AssertionKind::from_key(key) {
                self.rules
                    .entry(path.clone())
                    .or_default()
                    .push((kind, value.clone()));
            } else if let Some(name) = key.strip_prefix('#') {
                self.references.insert(name, value.clone());
            } else if let Some(marker) = LeafMarker::from_key(key) {
                let leaf = self.leaves.entry(path.clone()).or_default();
                apply_leaf_marker(leaf, marker, value, path)?;
            } else {
                return Err(SchemaError::InvalidKey {
                    key: key.clone(),
                    path: path.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// A multi-segment node key such as `/a/*` also describes `/a`.
    fn register_prefixes(&mut self, from: &TreePath, to: &TreePath) {
        let mut current = from.clone();
        for segment in &to.segments()[from.segments().len()..] {
            current = current.child(segment.clone());
            self.rules.entry(current.clone()).or_default();
        }
    }

    fn lower(self) -> Result<CompiledSchema> {
        let references = self.references;
        let mut rules = BTreeMap::new();
        let mut domains = BTreeMap::new();

        for (path, raw_rules) in self.rules {
            let mut compiled = Vec::with_capacity(raw_rules.len());
            for (kind, expectation) in raw_rules {
                let assertion = lower_assertion(kind, &expectation, &path, &references)?;
                if let Assertion::Matches(fields) = &assertion {
                    record_domains(&path, fields, &mut domains);
                }
                compiled.push(CompiledRule {
                    assertion,
                    expectation,
                });
            }
            rules.insert(path, compiled);
        }

        for (path, leaf) in &self.leaves {
            check_leaf_complete(path, leaf)?;
        }

        Ok(CompiledSchema {
            rules,
            references,
            leaves: self.leaves,
            domains,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum LeafMarker {
    Action,
    Path,
    Template,
    When,
    Defaults,
}

impl LeafMarker {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "action" => Some(Self::Action),
            "path" => Some(Self::Path),
            "template" => Some(Self::Template),
            "when" => Some(Self::When),
            "defaults" => Some(Self::Defaults),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Path => "path",
            Self::Template => "template",
            Self::When => "when",
            Self::Defaults => "defaults",
        }
    }
}

fn apply_leaf_marker(
    leaf: &mut LeafRule,
    marker: LeafMarker,
    value: &Value,
    path: &TreePath,
) -> std::result::Result<(), SchemaError> {
    let invalid = |message: &str| SchemaError::InvalidMarker {
        marker: marker.as_str().to_string(),
        path: path.to_string(),
        message: message.to_string(),
    };

    match marker {
        LeafMarker::Action => {
            leaf.action = match value.as_str() {
                Some("generate") => LeafAction::Generate,
                Some("suppress") => LeafAction::Suppress,
                _ => return Err(invalid("expected \"generate\" or \"suppress\"")),
            };
        }
        LeafMarker::Path => {
            let template = value.as_str().ok_or_else(|| invalid("expected a string"))?;
            leaf.path = Some(template.to_string());
        }
        LeafMarker::Template => {
            let source: TemplateSource = serde_json::from_value(value.clone()).map_err(|_| {
                invalid("expected a string or a dict with a \"main\" entry and string sub-templates")
            })?;
            leaf.template = Some(source);
        }
        LeafMarker::When => {
            leaf.when = parse_when_rules(value, path)?;
        }
        LeafMarker::Defaults => {
            let defaults = value.as_object().ok_or_else(|| invalid("expected a dict"))?;
            leaf.defaults = defaults.clone();
        }
    }

    Ok(())
}

/// A generating leaf needs both an output path and a content template.
fn check_leaf_complete(path: &TreePath, leaf: &LeafRule) -> std::result::Result<(), SchemaError> {
    if leaf.action == LeafAction::Suppress {
        return Ok(());
    }
    let missing = match (&leaf.path, &leaf.template) {
        (None, _) => "path",
        (_, None) => "template",
        _ => return Ok(()),
    };
    Err(SchemaError::InvalidMarker {
        marker: missing.to_string(),
        path: path.to_string(),
        message: "a generating leaf needs both \"path\" and \"template\"".to_string(),
    })
}

fn lower_assertion(
    kind: AssertionKind,
    expectation: &Value,
    path: &TreePath,
    references: &ReferenceTable,
) -> std::result::Result<Assertion, SchemaError> {
    match kind {
        AssertionKind::Matches => {
            let resolved = resolve_if_reference(expectation, references)?;
            let fields = resolved
                .as_object()
                .ok_or_else(|| SchemaError::MatchesNotDict(display_value(expectation)))?;
            Ok(Assertion::Matches(lower_fields(fields, references, 0)?))
        }
        AssertionKind::HasKeys => {
            let resolved = resolve_if_reference(expectation, references)?;
            let keys = resolved
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| SchemaError::InvalidExpectation {
                    kind: kind.as_str().to_string(),
                    path: path.to_string(),
                    message: format!("expected a list of keys, got '{}'", display_value(expectation)),
                })?;
            Ok(Assertion::HasKeys(keys))
        }
        AssertionKind::EachValue => Ok(Assertion::EachValue(lower_predicate(
            expectation,
            references,
            0,
        )?)),
    }
}

fn resolve_if_reference(
    value: &Value,
    references: &ReferenceTable,
) -> std::result::Result<Value, SchemaError> {
    match value.as_str().and_then(ReferenceToken::parse) {
        Some(token) => references.resolve(token),
        None => Ok(value.clone()),
    }
}

fn lower_fields(
    fields: &Map<String, Value>,
    references: &ReferenceTable,
    depth: usize,
) -> std::result::Result<Vec<FieldRule>, SchemaError> {
    fields
        .iter()
        .map(|(name, raw)| {
            Ok(FieldRule {
                name: name.clone(),
                predicate: lower_predicate(raw, references, depth)?,
            })
        })
        .collect()
}

fn lower_predicate(
    raw: &Value,
    references: &ReferenceTable,
    depth: usize,
) -> std::result::Result<Predicate, SchemaError> {
    match raw {
        Value::String(name) => match ReferenceToken::parse(name) {
            Some(token) => {
                if depth >= MAX_REFERENCE_DEPTH {
                    return Err(SchemaError::InvalidReference(token.target().to_string()));
                }
                let resolved = references.resolve(token)?;
                match resolved {
                    Value::Array(values) => Ok(Predicate::OneOf(values)),
                    Value::Object(fields) => Ok(Predicate::Fields(lower_fields(
                        &fields,
                        references,
                        depth + 1,
                    )?)),
                    Value::String(primitive) => Predicate::primitive(&primitive)
                        .ok_or(SchemaError::UnknownPredicate(primitive)),
                    other => Err(SchemaError::UnknownPredicate(display_value(&other))),
                }
            }
            None => Predicate::primitive(name)
                .ok_or_else(|| SchemaError::UnknownPredicate(name.clone())),
        },
        Value::Array(values) => Ok(Predicate::OneOf(values.clone())),
        other => Err(SchemaError::UnknownPredicate(display_value(other))),
    }
}

fn record_domains(
    path: &TreePath,
    fields: &[FieldRule],
    domains: &mut BTreeMap<TreePath, Vec<Value>>,
) {
    for field in fields {
        if let Predicate::OneOf(values) = &field.predicate {
            let domain = values
                .iter()
                .filter(|value| !is_wildcard(value))
                .cloned()
                .collect();
            domains.insert(path.child_key(&field.name), domain);
        }
    }
}
