//! Per-selection rendering: extended selection, `when` rules, content
//! resolution, and artifact emission.

use std::path::PathBuf;

use serde_json::{Map, Value};
use testgen_core::{SchemaError, TreePath};
use testgen_schema::{DoAction, LeafRule, TemplateSource, WhenRule};
use tracing::debug;

use crate::errors::GenerationError;
use crate::expand::Selection;
use crate::model::{GenerateOptions, GenerationReport, INDEX_KEY, MODE_KEY};
use crate::output::ArtifactWriter;
use crate::template;
use crate::templates::TemplateReader;

/// Substitution context of one candidate.
///
/// Immutable: [`ExtendedSelection::with`] returns a new context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedSelection {
    values: Map<String, Value>,
}

impl ExtendedSelection {
    /// Merge, in increasing precedence: leaf defaults, reserved keys, the
    /// selection, and ancestor fields. The closest ancestor's fields get a
    /// `_` prefix and each further level one more.
    pub fn build(
        defaults: &Map<String, Value>,
        mode: &str,
        emission_index: u64,
        selection: &Selection,
        ancestors: &[&Map<String, Value>],
    ) -> Self {
        let mut values = defaults.clone();
        values.insert(MODE_KEY.to_string(), Value::String(mode.to_string()));
        values.insert(INDEX_KEY.to_string(), Value::from(emission_index));
        for (key, value) in selection {
            values.insert(key.clone(), value.clone());
        }

        let mut prefix = String::from("_");
        for ancestor in ancestors.iter().rev() {
            for (key, value) in ancestor.iter() {
                values.insert(format!("{prefix}{key}"), value.clone());
            }
            prefix.push('_');
        }

        Self { values }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn with(&self, key: &str, value: Value) -> Self {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value);
        Self { values }
    }
}

/// Renders leaves against extended selections and hands the results to a
/// writer.
pub struct TemplateRenderer<'r> {
    reader: &'r dyn TemplateReader,
    search_paths: &'r [PathBuf],
    require_substitution: bool,
}

impl<'r> TemplateRenderer<'r> {
    pub fn new(reader: &'r dyn TemplateReader, options: &'r GenerateOptions) -> Self {
        Self {
            reader,
            search_paths: &options.template_dirs,
            require_substitution: options.require_substitution,
        }
    }

    /// Evaluate the leaf's `when` rules, then write its primary artifact.
    pub fn render_leaf(
        &self,
        leaf: &LeafRule,
        leaf_path: &TreePath,
        selection: ExtendedSelection,
        writer: &mut dyn ArtifactWriter,
        report: &mut GenerationReport,
    ) -> Result<(), GenerationError> {
        let (Some(path_template), Some(source)) = (&leaf.path, &leaf.template) else {
            return Err(SchemaError::InvalidMarker {
                marker: "path".to_string(),
                path: leaf_path.to_string(),
                message: "a generating leaf needs both \"path\" and \"template\"".to_string(),
            }
            .into());
        };

        let selection = self.apply_when_rules(&leaf.when, selection, writer, report)?;
        let path = template::render(path_template, selection.values())?;
        let content = self.render_content(source, &selection, false)?;
        emit(writer, report, &path, &content)?;
        debug!(leaf = %leaf_path, path = %path, "leaf rendered");
        Ok(())
    }

    fn apply_when_rules(
        &self,
        rules: &[WhenRule],
        selection: ExtendedSelection,
        writer: &mut dyn ArtifactWriter,
        report: &mut GenerationReport,
    ) -> Result<ExtendedSelection, GenerationError> {
        let mut current = selection;
        for rule in rules {
            if !rule_fires(rule, &current)? {
                continue;
            }
            for action in &rule.actions {
                current = self.run_action(action, current, writer, report)?;
            }
        }
        Ok(current)
    }

    fn run_action(
        &self,
        action: &DoAction,
        selection: ExtendedSelection,
        writer: &mut dyn ArtifactWriter,
        report: &mut GenerationReport,
    ) -> Result<ExtendedSelection, GenerationError> {
        match action {
            DoAction::Generate {
                path,
                template: source,
            } => {
                let path = self.render_action(path, selection.values())?;
                let content = self.render_content(source, &selection, self.require_substitution)?;
                emit(writer, report, &path, &content)?;
                Ok(selection)
            }
            DoAction::SetExtension { key, template } => {
                let value = self.render_action(template, selection.values())?;
                Ok(selection.with(key, Value::String(value)))
            }
        }
    }

    fn render_action(
        &self,
        text: &str,
        values: &Map<String, Value>,
    ) -> Result<String, SchemaError> {
        if self.require_substitution {
            template::render_substituted(text, values)
        } else {
            template::render(text, values)
        }
    }

    /// Render inline content directly; for an external template, render and
    /// inject every sub-template before rendering `main`.
    fn render_content(
        &self,
        source: &TemplateSource,
        selection: &ExtendedSelection,
        strict: bool,
    ) -> Result<String, GenerationError> {
        let (text, context) = match source {
            TemplateSource::Inline(text) => (text.clone(), selection.clone()),
            TemplateSource::External(external) => {
                let mut context = selection.clone();
                for (key, reference) in &external.sub_templates {
                    let sub = self.fetch(reference, selection)?;
                    let rendered = template::render(&sub, selection.values())?;
                    context = context.with(key, Value::String(rendered));
                }
                (self.fetch(&external.main, selection)?, context)
            }
        };

        let rendered = if strict {
            template::render_substituted(&text, context.values())?
        } else {
            template::render(&text, context.values())?
        };
        Ok(rendered)
    }

    fn fetch(
        &self,
        reference: &str,
        selection: &ExtendedSelection,
    ) -> Result<String, GenerationError> {
        let reference = template::render(reference, selection.values())?;
        self.reader.read(&reference, self.search_paths)
    }
}

fn rule_fires(rule: &WhenRule, selection: &ExtendedSelection) -> Result<bool, SchemaError> {
    for [left, right] in &rule.match_any {
        if template::render(left, selection.values())? == template::render(right, selection.values())? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn emit(
    writer: &mut dyn ArtifactWriter,
    report: &mut GenerationReport,
    path: &str,
    content: &str,
) -> Result<(), GenerationError> {
    let bytes = writer.write(path, content)?;
    report.record_artifact(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testgen_schema::ExternalTemplate;

    use super::*;
    use crate::output::MemoryWriter;
    use crate::templates::StaticTemplates;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn report() -> GenerationReport {
        GenerationReport::new("test".to_string(), "release")
    }

    #[test]
    fn extended_selection_layers_and_prefixes() {
        let defaults = map(json!({"timeout": "short", "color": "none"}));
        let outer = map(json!({"name": "suite"}));
        let inner = map(json!({"name": "group"}));
        let selection = map(json!({"color": "red"}));

        let extended =
            ExtendedSelection::build(&defaults, "debug", 3, &selection, &[&outer, &inner]);

        assert_eq!(extended.get("color"), Some(&json!("red")));
        assert_eq!(extended.get("timeout"), Some(&json!("short")));
        assert_eq!(extended.get(MODE_KEY), Some(&json!("debug")));
        assert_eq!(extended.get(INDEX_KEY), Some(&json!(3)));
        assert_eq!(extended.get("_name"), Some(&json!("group")));
        assert_eq!(extended.get("__name"), Some(&json!("suite")));
    }

    #[test]
    fn with_leaves_the_original_untouched() {
        let base = ExtendedSelection::default();
        let extended = base.with("ext", json!("headers"));
        assert_eq!(base.get("ext"), None);
        assert_eq!(extended.get("ext"), Some(&json!("headers")));
    }

    #[test]
    fn set_extension_is_visible_to_later_actions_and_the_leaf() {
        let leaf = LeafRule {
            path: Some("%(name)s.%(ext)s".to_string()),
            template: Some(TemplateSource::Inline("%(ext)s".to_string())),
            when: vec![WhenRule {
                match_any: vec![["%(name)s".to_string(), "a".to_string()]],
                actions: vec![
                    DoAction::SetExtension {
                        key: "ext".to_string(),
                        template: "txt".to_string(),
                    },
                    DoAction::Generate {
                        path: "%(name)s.extra".to_string(),
                        template: TemplateSource::Inline("ext=%(ext)s".to_string()),
                    },
                ],
            }],
            ..LeafRule::default()
        };
        let options = GenerateOptions::default();
        let reader = StaticTemplates::new();
        let renderer = TemplateRenderer::new(&reader, &options);
        let mut writer = MemoryWriter::new();
        let mut report = report();

        let selection = ExtendedSelection::default().with("name", json!("a"));
        renderer
            .render_leaf(&leaf, &TreePath::root(), selection, &mut writer, &mut report)
            .expect("render");

        let artifacts = writer.artifacts();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].path, "a.extra");
        assert_eq!(artifacts[0].content, "ext=txt");
        assert_eq!(artifacts[1].path, "a.txt");
        assert_eq!(report.artifacts, 2);
    }

    #[test]
    fn sub_templates_are_injected_before_main() {
        let source = TemplateSource::External(ExternalTemplate {
            main: "%(kind)s.template".to_string(),
            sub_templates: [("header".to_string(), "header.template".to_string())]
                .into_iter()
                .collect(),
        });
        let reader = StaticTemplates::new()
            .with("case.template", "%(header)s\nbody of %(name)s")
            .with("header.template", "# %(name)s");
        let options = GenerateOptions::default();
        let renderer = TemplateRenderer::new(&reader, &options);

        let selection = ExtendedSelection::default()
            .with("kind", json!("case"))
            .with("name", json!("lemon"));
        let content = renderer
            .render_content(&source, &selection, false)
            .expect("content");
        assert_eq!(content, "# lemon\nbody of lemon");
    }

    #[test]
    fn required_substitution_rejects_static_action_templates() {
        let leaf = LeafRule {
            path: Some("out".to_string()),
            template: Some(TemplateSource::Inline("static".to_string())),
            when: vec![WhenRule {
                match_any: vec![["x".to_string(), "x".to_string()]],
                actions: vec![DoAction::SetExtension {
                    key: "ext".to_string(),
                    template: "no placeholders".to_string(),
                }],
            }],
            ..LeafRule::default()
        };
        let options = GenerateOptions {
            require_substitution: true,
            ..GenerateOptions::default()
        };
        let reader = StaticTemplates::new();
        let renderer = TemplateRenderer::new(&reader, &options);
        let mut writer = MemoryWriter::new();

        let err = renderer
            .render_leaf(
                &leaf,
                &TreePath::root(),
                ExtendedSelection::default(),
                &mut writer,
                &mut report(),
            )
            .unwrap_err();
        assert!(err.is_schema_defect());
        assert!(writer.artifacts().is_empty());
    }
}
