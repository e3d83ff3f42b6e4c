//! Artifact generation for testgen.
//!
//! Expands the dimensioned patterns of a validated specification, removes
//! the selections declared by suppress leaves, and renders every remaining
//! selection through the leaf's templates into a writer.

pub mod engine;
pub mod errors;
pub mod exclusion;
pub mod expand;
pub mod model;
pub mod output;
pub mod render;
pub mod template;
pub mod templates;

pub use engine::GenerationEngine;
pub use errors::GenerationError;
pub use exclusion::{ExclusionSet, exclusion_key};
pub use expand::{Dimension, LeafPattern, PatternExpander, Selection, Selections};
pub use model::{GenerateOptions, GenerationReport, INDEX_KEY, MODE_KEY};
pub use output::{Artifact, ArtifactWriter, DryRunWriter, FsArtifactWriter, MemoryWriter};
pub use render::{ExtendedSelection, TemplateRenderer};
pub use templates::{FsTemplateReader, StaticTemplates, TemplateReader};
