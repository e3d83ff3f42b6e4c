use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CliError;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "testgen.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub generate: GenerateSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateSettings {
    pub mode: Option<String>,
    pub template_dirs: Vec<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub require_substitution: Option<bool>,
}

/// Load settings from `explicit`, or from `testgen.toml` in the working
/// directory when it exists. An explicit path must exist.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                return Ok(Settings::default());
            }
            fallback
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    parse_settings(&content, &path)
}

/// Relative directories in the file are taken relative to the file itself.
fn parse_settings(content: &str, path: &Path) -> Result<Settings, CliError> {
    let mut settings: Settings = toml::from_str(content).map_err(|err| CliError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let generate = &mut settings.generate;
    for dir in &mut generate.template_dirs {
        *dir = base.join(&*dir);
    }
    if let Some(out_dir) = generate.out_dir.as_mut() {
        *out_dir = base.join(&*out_dir);
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_section_relative_to_file() {
        let settings = parse_settings(
            r#"
[generate]
mode = "debug"
template_dirs = ["templates", "/abs/templates"]
out_dir = "out"
require_substitution = true
"#,
            Path::new("/project/testgen.toml"),
        )
        .expect("parse settings");

        assert_eq!(settings.generate.mode.as_deref(), Some("debug"));
        assert_eq!(
            settings.generate.template_dirs,
            vec![
                PathBuf::from("/project/templates"),
                PathBuf::from("/abs/templates")
            ]
        );
        assert_eq!(settings.generate.out_dir, Some(PathBuf::from("/project/out")));
        assert_eq!(settings.generate.require_substitution, Some(true));
    }

    #[test]
    fn empty_file_yields_defaults() {
        let settings = parse_settings("", Path::new("testgen.toml")).expect("parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_settings("[generate]\nseed = 4\n", Path::new("testgen.toml")).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let err = load_settings(Some(Path::new("/definitely/not/testgen.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
