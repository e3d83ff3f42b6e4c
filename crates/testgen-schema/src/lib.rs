//! Schema rule engine for testgen.
//!
//! Compiles a schema tree into path-keyed rule tables and validates
//! specification trees against them.

pub mod compile;
pub mod model;
pub mod references;
pub mod schema;
pub mod validate;

pub use compile::{CompiledSchema, compile_schema};
pub use model::{
    Assertion, AssertionKind, CompiledRule, DoAction, ExternalTemplate, FieldRule, LeafAction,
    LeafRule, Predicate, TemplateSource, WhenRule,
};
pub use references::{ReferenceTable, ReferenceToken};
pub use schema::{parse_when_rules, when_json_schema};
pub use validate::{ErrorDetails, Validator, validate_spec};
