use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use testgen_schema::{CompiledSchema, ErrorDetails, LeafAction, validate_spec};

use crate::errors::GenerationError;
use crate::exclusion::ExclusionSet;
use crate::expand::{LeafPattern, PatternExpander};
use crate::model::{GenerateOptions, GenerationReport};
use crate::output::ArtifactWriter;
use crate::render::{ExtendedSelection, TemplateRenderer};
use crate::templates::TemplateReader;

/// Entry point for generating artifacts from a specification and schema.
#[derive(Debug, Clone, Default)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Compile the schema, validate the specification, and generate.
    pub fn run(
        &self,
        spec: &Value,
        schema: &Value,
        reader: &dyn TemplateReader,
        writer: &mut dyn ArtifactWriter,
    ) -> Result<GenerationReport, GenerationError> {
        let mut details = ErrorDetails::default();
        let compiled = validate_spec(spec, schema, &mut details).inspect_err(|err| {
            warn!(error = %err, path = %details.path, "specification rejected");
        })?;
        self.generate(spec, &compiled, reader, writer)
    }

    /// Generate from a specification already validated against `schema`.
    ///
    /// Every suppress leaf is expanded into the exclusion set before the
    /// first artifact renders. The emission index advances for each
    /// generate candidate, suppressed ones included.
    pub fn generate(
        &self,
        spec: &Value,
        schema: &CompiledSchema,
        reader: &dyn TemplateReader,
        writer: &mut dyn ArtifactWriter,
    ) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut report = GenerationReport::new(run_id.clone(), &self.options.mode);

        info!(
            run_id = %run_id,
            mode = %self.options.mode,
            template_dirs = self.options.template_dirs.len(),
            "generation started"
        );

        let patterns = PatternExpander::new(schema).leaf_patterns(spec)?;
        let exclusions = collect_exclusions(schema, &patterns);
        report.excluded_patterns = exclusions.len() as u64;

        let renderer = TemplateRenderer::new(reader, &self.options);
        let mut emission_index = 0_u64;
        for pattern in &patterns {
            let Some(leaf) = schema.leaf(&pattern.leaf_path) else {
                continue;
            };
            if leaf.action != LeafAction::Generate {
                continue;
            }

            let before = report.artifacts;
            for selection in pattern.selections() {
                let index = emission_index;
                emission_index += 1;
                report.candidates += 1;

                if exclusions.contains(&selection) {
                    report.suppressed += 1;
                    continue;
                }

                let extended = ExtendedSelection::build(
                    &leaf.defaults,
                    &self.options.mode,
                    index,
                    &selection,
                    &pattern.ancestors,
                );
                renderer
                    .render_leaf(leaf, &pattern.leaf_path, extended, writer, &mut report)
                    .inspect_err(|err| {
                        warn!(run_id = %run_id, path = %pattern.path, error = %err, "generation failed");
                    })?;
            }
            debug!(
                path = %pattern.path,
                artifacts = report.artifacts - before,
                "pattern generated"
            );
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            candidates = report.candidates,
            suppressed = report.suppressed,
            artifacts = report.artifacts,
            bytes_written = report.bytes_written,
            duration_ms = report.duration_ms,
            "generation completed"
        );
        Ok(report)
    }
}

fn collect_exclusions(schema: &CompiledSchema, patterns: &[LeafPattern<'_>]) -> ExclusionSet {
    let mut exclusions = ExclusionSet::new();
    for pattern in patterns {
        let suppressing = schema
            .leaf(&pattern.leaf_path)
            .is_some_and(|leaf| leaf.action == LeafAction::Suppress);
        if !suppressing {
            continue;
        }
        for selection in pattern.selections() {
            exclusions.insert(&selection);
        }
        debug!(path = %pattern.path, excluded = exclusions.len(), "suppress pattern expanded");
    }
    exclusions
}
