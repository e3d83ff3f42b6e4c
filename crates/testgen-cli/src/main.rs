mod config;
mod input;
mod logging;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use testgen_core::{SchemaError, SpecError};
use testgen_generate::output::fs::write_bytes_atomic;
use testgen_generate::{
    ArtifactWriter, DryRunWriter, FsArtifactWriter, FsTemplateReader, GenerateOptions,
    GenerationEngine, GenerationError,
};
use testgen_schema::{CompiledSchema, ErrorDetails, validate_spec};
use thiserror::Error;

use config::{Settings, load_settings};
use input::load_json;
use logging::init_logging;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("spec error: {error}")]
    Spec {
        error: SpecError,
        details: ErrorDetails,
    },
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Schema(_) => 2,
            CliError::Generation(err) if err.is_schema_defect() => 2,
            _ => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "testgen", version, about = "Declarative test artifact generator")]
struct Cli {
    /// Write JSON logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "FILE")]
    log_json: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a specification against a schema.
    Validate(InputArgs),
    /// Validate, then render every selection into artifacts.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Specification JSON file.
    #[arg(long, value_name = "FILE")]
    spec: PathBuf,
    /// Schema JSON file.
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Generation mode exposed to templates as `generation_mode`.
    #[arg(long)]
    mode: Option<String>,
    /// Print artifacts to stdout instead of writing them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Output root for artifact paths.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// Template search directory; repeat to search several in order.
    #[arg(long = "template-dir", value_name = "DIR")]
    template_dirs: Vec<PathBuf>,
    /// Config file (defaults to ./testgen.toml when present).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Write the generation report as JSON to this file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.log_json.as_deref(), cli.verbose) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Generate(args) => run_generate(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            if let CliError::Spec { details, .. } = &err {
                match serde_json::to_string_pretty(details) {
                    Ok(rendered) => eprintln!("{rendered}"),
                    Err(render_err) => eprintln!("failed to render details: {render_err}"),
                }
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run_validate(args: InputArgs) -> Result<(), CliError> {
    let (_, compiled) = load_and_validate(&args)?;
    tracing::info!(
        spec = %args.spec.display(),
        leaves = compiled.leaves().count(),
        "specification valid"
    );
    println!("{}: valid", args.spec.display());
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let settings = load_settings(args.config.as_deref())?;
    let options = resolve_options(&args, &settings);
    let (spec, compiled) = load_and_validate(&args.input)?;

    let engine = GenerationEngine::new(options);
    tracing::debug!(
        mode = %engine.options().mode,
        template_dirs = ?engine.options().template_dirs,
        "generation options resolved"
    );
    let reader = FsTemplateReader::new();
    let report = if args.dry_run {
        let mut writer = DryRunWriter::new(io::stdout().lock());
        generate_into(&engine, &spec, &compiled, &reader, &mut writer)?
    } else {
        let out_dir = args
            .out_dir
            .clone()
            .or_else(|| settings.generate.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut writer = FsArtifactWriter::new(out_dir);
        generate_into(&engine, &spec, &compiled, &reader, &mut writer)?
    };

    if let Some(path) = &args.report {
        write_bytes_atomic(path, &serde_json::to_vec_pretty(&report)?)?;
        tracing::info!(path = %path.display(), "report written");
    }
    if !args.dry_run {
        println!(
            "{} artifacts written ({} of {} candidates suppressed), run {}",
            report.artifacts, report.suppressed, report.candidates, report.run_id
        );
    }
    Ok(())
}

fn generate_into(
    engine: &GenerationEngine,
    spec: &Value,
    compiled: &CompiledSchema,
    reader: &FsTemplateReader,
    writer: &mut dyn ArtifactWriter,
) -> Result<testgen_generate::GenerationReport, CliError> {
    Ok(engine.generate(spec, compiled, reader, writer)?)
}

/// Flags override the config file; without either, templates are looked up
/// next to the schema file.
fn resolve_options(args: &GenerateArgs, settings: &Settings) -> GenerateOptions {
    let defaults = GenerateOptions::default();
    let configured = &settings.generate;

    let template_dirs = if !args.template_dirs.is_empty() {
        args.template_dirs.clone()
    } else if !configured.template_dirs.is_empty() {
        configured.template_dirs.clone()
    } else {
        vec![parent_dir(&args.input.schema)]
    };

    GenerateOptions {
        mode: args
            .mode
            .clone()
            .or_else(|| configured.mode.clone())
            .unwrap_or(defaults.mode),
        template_dirs,
        require_substitution: configured
            .require_substitution
            .unwrap_or(defaults.require_substitution),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_and_validate(args: &InputArgs) -> Result<(Value, CompiledSchema), CliError> {
    let spec = load_json(&args.spec)?;
    let schema = load_json(&args.schema)?;

    let mut details = ErrorDetails::default();
    match validate_spec(&spec, &schema, &mut details) {
        Ok(compiled) => Ok((spec, compiled)),
        Err(testgen_core::Error::Schema(err)) => Err(CliError::Schema(err)),
        Err(testgen_core::Error::Spec(error)) => Err(CliError::Spec { error, details }),
    }
}

#[cfg(test)]
mod tests {
    use testgen_core::Violation;

    use super::*;

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["testgen", "generate", "--spec", "s.json", "--schema", "conf/schema.json"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Generate(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let settings = Settings {
            generate: config::GenerateSettings {
                mode: Some("debug".to_string()),
                template_dirs: vec![PathBuf::from("from-config")],
                out_dir: None,
                require_substitution: Some(true),
            },
        };

        let options = resolve_options(
            &generate_args(&["--mode", "release", "--template-dir", "a", "--template-dir", "b"]),
            &settings,
        );
        assert_eq!(options.mode, "release");
        assert_eq!(options.template_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(options.require_substitution);

        let options = resolve_options(&generate_args(&[]), &settings);
        assert_eq!(options.mode, "debug");
        assert_eq!(options.template_dirs, vec![PathBuf::from("from-config")]);
    }

    #[test]
    fn templates_default_to_the_schema_directory() {
        let options = resolve_options(&generate_args(&[]), &Settings::default());
        assert_eq!(options.mode, "release");
        assert_eq!(options.template_dirs, vec![PathBuf::from("conf")]);
        assert!(!options.require_substitution);
    }

    #[test]
    fn exit_codes_separate_error_kinds() {
        let schema = CliError::Schema(SchemaError::UnknownPredicate("x".to_string()));
        let spec = CliError::Spec {
            error: SpecError::new("/", Violation::NoRule("/".to_string())),
            details: ErrorDetails::default(),
        };
        let generation = CliError::Generation(GenerationError::Schema(
            SchemaError::InvalidReference("x".to_string()),
        ));

        assert_eq!(schema.exit_code(), 2);
        assert_eq!(generation.exit_code(), 2);
        assert_eq!(spec.exit_code(), 1);
        assert_eq!(CliError::Logging("x".to_string()).exit_code(), 1);
    }
}
