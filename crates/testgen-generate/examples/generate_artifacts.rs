use std::env;
use std::path::PathBuf;

use testgen_generate::{
    DryRunWriter, FsArtifactWriter, FsTemplateReader, GenerateOptions, GenerationEngine,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut spec_path: Option<PathBuf> = None;
    let mut schema_path: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut options = GenerateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--spec" => spec_path = args.next().map(PathBuf::from),
            "--schema" => schema_path = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from),
            "--template-dir" => options.template_dirs.extend(args.next().map(PathBuf::from)),
            "--mode" => options.mode = args.next().ok_or("missing --mode value")?,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let spec_path = spec_path.ok_or("missing --spec path")?;
    let schema_path = schema_path.ok_or("missing --schema path")?;
    let spec: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&spec_path)?)?;
    let schema: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&schema_path)?)?;

    let engine = GenerationEngine::new(options);
    let reader = FsTemplateReader::new();
    let report = match out_dir {
        Some(out_dir) => engine.run(&spec, &schema, &reader, &mut FsArtifactWriter::new(out_dir))?,
        None => engine.run(
            &spec,
            &schema,
            &reader,
            &mut DryRunWriter::new(std::io::stdout().lock()),
        )?,
    };

    eprintln!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
