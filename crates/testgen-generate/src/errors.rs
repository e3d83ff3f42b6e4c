use std::path::PathBuf;

use testgen_core::{SchemaError, SpecError};
use thiserror::Error;

/// Errors emitted by the generation pipeline.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("template '{reference}' not found in search paths [{searched}]")]
    TemplateNotFound { reference: String, searched: String },
    #[error("failed to read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Returns true when the schema, not the specification or the
    /// environment, is at fault.
    pub fn is_schema_defect(&self) -> bool {
        matches!(self, GenerationError::Schema(_))
    }
}

impl From<testgen_core::Error> for GenerationError {
    fn from(err: testgen_core::Error) -> Self {
        match err {
            testgen_core::Error::Schema(err) => GenerationError::Schema(err),
            testgen_core::Error::Spec(err) => GenerationError::Spec(err),
        }
    }
}
