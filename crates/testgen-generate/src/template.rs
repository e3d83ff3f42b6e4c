//! `%(key)s` placeholder substitution.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use testgen_core::{SchemaError, display_value};

fn placeholder() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| {
            Regex::new(r"%(?:\((?P<key>[^)]*)\)(?P<conversion>[sd])|(?P<escape>%))?").ok()
        })
        .as_ref()
}

fn template_error(template: &str, cause: String) -> SchemaError {
    SchemaError::Template {
        template: template.to_string(),
        cause,
    }
}

/// Substitute every placeholder in `template` from `values`.
///
/// `%(key)s` inserts the value as text, `%(key)d` as an integer, and `%%` a
/// literal percent sign. Any other use of `%` is malformed.
pub fn render(template: &str, values: &Map<String, Value>) -> Result<String, SchemaError> {
    let pattern = placeholder()
        .ok_or_else(|| template_error(template, "placeholder pattern unavailable".to_string()))?;
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in pattern.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        if caps.name("escape").is_some() {
            out.push('%');
            continue;
        }
        let (Some(key), Some(conversion)) = (caps.name("key"), caps.name("conversion")) else {
            return Err(template_error(
                template,
                format!("incomplete format at offset {}", whole.start()),
            ));
        };

        let key = key.as_str();
        let value = values
            .get(key)
            .ok_or_else(|| template_error(template, format!("missing key '{key}'")))?;
        match conversion.as_str() {
            "d" => out.push_str(&format_integer(value).ok_or_else(|| {
                template_error(
                    template,
                    format!("%d format requires a number, got '{}'", display_value(value)),
                )
            })?),
            _ => out.push_str(&display_value(value)),
        }
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Like [`render`], but fails when the output equals the template.
pub fn render_substituted(
    template: &str,
    values: &Map<String, Value>,
) -> Result<String, SchemaError> {
    let rendered = render(template, values)?;
    if rendered == template {
        return Err(template_error(
            template,
            "template produced no substitution".to_string(),
        ));
    }
    Ok(rendered)
}

fn format_integer(value: &Value) -> Option<String> {
    if let Some(int) = value.as_i64() {
        return Some(int.to_string());
    }
    if let Some(int) = value.as_u64() {
        return Some(int.to_string());
    }
    value.as_f64().map(|float| (float.trunc() as i64).to_string())
}
