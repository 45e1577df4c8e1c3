mod output;

use std::fs;
use std::path::{Path, PathBuf};

use avro_resolve::{
    ResolutionReport, ResolutionStatus, Resolver, ResolverConfig, Severity, classify,
    expand_inputs,
};
use clap::{Args, Parser, Subcommand};

use crate::output::{OutputFormat, classification_to_table, format_report, format_resolution};

const EXIT_FAILURE: i32 = 1;
const EXIT_UNRESOLVED: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "avro-resolve", version)]
#[command(about = "Resolve Avro schema and protocol documents in any order")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve schema and protocol documents into one set of definitions.
    Resolve(ResolveArgs),
    /// Show how input files are classified without resolving them.
    Classify(ClassifyArgs),
    /// Write a default configuration file.
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Schema/protocol files and/or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output format for the resolved definitions.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
    /// Write resolved definitions to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write the run report (JSON, or YAML for .yml/.yaml paths).
    #[arg(long)]
    report: Option<PathBuf>,
    /// Exit with status 2 when some documents could not be resolved.
    #[arg(long)]
    deny_unresolved: bool,
    /// Maximum number of resolver passes.
    #[arg(long)]
    max_passes: Option<usize>,
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// Files and/or directories to classify.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InitConfigArgs {
    /// Path of the configuration file to create.
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Resolve(args) => run_resolve(args),
        Command::Classify(args) => run_classify(args).map(|()| 0),
        Command::InitConfig(args) => run_init_config(args).map(|()| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn run_resolve(args: ResolveArgs) -> Result<i32, String> {
    let mut config = load_config(args.config.as_deref())?;
    if args.max_passes.is_some() {
        config.max_passes = args.max_passes;
    }
    let deny_unresolved = args.deny_unresolved || config.deny_unresolved;

    let paths = expand_inputs(&args.inputs).map_err(|e| e.to_string())?;
    let outcome = Resolver::with_config(config)
        .resolve_paths(&paths)
        .map_err(|e| e.to_string())?;

    let rendered = format_resolution(&outcome.resolution, args.format)?;
    match &args.output {
        Some(path) => write_file(path, &rendered)?,
        None => print!("{rendered}"),
    }

    if let Some(path) = &args.report {
        let format = if is_yaml_path(path) {
            OutputFormat::Yaml
        } else {
            OutputFormat::Json
        };
        write_file(path, &format_report(&outcome.report, format)?)?;
    }

    print_diagnostics(&outcome.report);
    eprintln!(
        "Resolved {} type(s) and {} protocol(s) in {} pass(es); status: {}.",
        outcome.report.types, outcome.report.protocols, outcome.report.passes, outcome.report.status
    );

    if deny_unresolved && outcome.status() == ResolutionStatus::Partial {
        eprintln!("error: resolution is incomplete");
        return Ok(EXIT_UNRESOLVED);
    }
    Ok(0)
}

fn run_classify(args: ClassifyArgs) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let paths = expand_inputs(&args.inputs).map_err(|e| e.to_string())?;

    let mut report = ResolutionReport::new();
    let classification = classify(&paths, &config, &mut report);

    print!("{}", classification_to_table(&classification));
    print_diagnostics(&report);
    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<(), String> {
    if args.path.exists() && !args.force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            args.path.display()
        ));
    }
    ensure_parent_dir(&args.path)?;
    ResolverConfig::default()
        .save(&args.path)
        .map_err(|e| format!("Failed to write '{}': {e}", args.path.display()))?;
    println!("Wrote default configuration to '{}'.", args.path.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig, String> {
    match path {
        Some(path) => ResolverConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(ResolverConfig::default()),
    }
}

fn print_diagnostics(report: &ResolutionReport) {
    for diagnostic in &report.diagnostics {
        if diagnostic.severity < Severity::Warning {
            continue;
        }
        let level = match diagnostic.severity {
            Severity::Error => "error",
            _ => "warning",
        };
        let path = diagnostic.path.as_deref().unwrap_or("-");
        eprintln!("{level}: [{}] {path}: {}", diagnostic.code, diagnostic.detail);
    }
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    ensure_parent_dir(path)?;
    fs::write(path, contents).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}
