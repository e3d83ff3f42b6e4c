use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Assertion names accepted as schema keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    Matches,
    HasKeys,
    EachValue,
}

impl AssertionKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "matches" => Some(Self::Matches),
            "has_keys" => Some(Self::HasKeys),
            "each_value" => Some(Self::EachValue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matches => "matches",
            Self::HasKeys => "has_keys",
            Self::EachValue => "each_value",
        }
    }
}

/// Check applied to a single field or element.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    NonEmptyString,
    NonEmptyList,
    NonEmptyDict,
    Integer,
    ExistingFile,
    /// Value (or every element of a list value) must be one of these.
    OneOf(Vec<Value>),
    /// Value must be a dict matching these fields exactly.
    Fields(Vec<FieldRule>),
}

impl Predicate {
    pub fn primitive(name: &str) -> Option<Self> {
        match name {
            "non_empty_string" => Some(Self::NonEmptyString),
            "non_empty_list" => Some(Self::NonEmptyList),
            "non_empty_dict" => Some(Self::NonEmptyDict),
            "integer" => Some(Self::Integer),
            "existing_file" => Some(Self::ExistingFile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: String,
    pub predicate: Predicate,
}

/// Compiled assertion with its validated payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Matches(Vec<FieldRule>),
    HasKeys(Vec<String>),
    EachValue(Predicate),
}

impl Assertion {
    pub fn kind(&self) -> AssertionKind {
        match self {
            Self::Matches(_) => AssertionKind::Matches,
            Self::HasKeys(_) => AssertionKind::HasKeys,
            Self::EachValue(_) => AssertionKind::EachValue,
        }
    }
}

/// Assertion plus the raw expectation it was compiled from, kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub assertion: Assertion,
    pub expectation: Value,
}

/// What a leaf does with its selections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LeafAction {
    #[default]
    Generate,
    Suppress,
}

/// Content template: inline text or a reference to an external file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TemplateSource {
    Inline(String),
    External(ExternalTemplate),
}

/// External template reference.
///
/// `main` names the template file; every other entry names a sub-template
/// whose rendered text is injected under its key before `main` renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExternalTemplate {
    pub main: String,
    #[serde(flatten)]
    pub sub_templates: BTreeMap<String, String>,
}

/// Conditional post-rule attached to a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WhenRule {
    /// Template pairs; the rule fires when both sides of any pair render
    /// to the same text.
    pub match_any: Vec<[String; 2]>,
    /// Actions run in order when the rule fires.
    #[serde(rename = "do")]
    pub actions: Vec<DoAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DoAction {
    /// Write an additional artifact.
    Generate {
        path: String,
        template: TemplateSource,
    },
    /// Store a rendered value in the extended selection.
    SetExtension { key: String, template: String },
}

/// Generation markers registered at a schema path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafRule {
    pub path: Option<String>,
    pub template: Option<TemplateSource>,
    pub action: LeafAction,
    pub when: Vec<WhenRule>,
    pub defaults: Map<String, Value>,
}
