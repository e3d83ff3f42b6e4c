//! Core contracts and helpers for testgen.
//!
//! This crate defines the structured tree paths, value helpers, and the two
//! error kinds shared by the rule engine, the generator, and the CLI.

pub mod error;
pub mod path;
pub mod value;

pub use error::{Error, Result, SchemaError, SpecError, Violation};
pub use path::{Segment, TreePath};
pub use value::{WILDCARD, display_value, entries, is_container, is_wildcard, type_name};
