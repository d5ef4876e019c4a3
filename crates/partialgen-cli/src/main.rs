//! Command-line interface for the partialgen generators and analyzers

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use partialgen_compiler::{AddCallbackStubFix, AnalysisHost, GenerationPipeline, GeneratorConfig};
use partialgen_core::cancellation::CancellationToken;
use std::path::{Path, PathBuf};

mod report;
mod snapshots;

use report::{CheckReport, DiagnosticRecord, FixReport, GenerateReport, OutputFormat};
use snapshots::LoadedSnapshot;

/// Default configuration file name, looked up in the working directory
const CONFIG_FILE: &str = "partialgen.toml";

#[derive(Parser)]
#[command(name = "partialgen")]
#[command(about = "Annotation-driven partial class generation for Unity projects")]
#[command(version)]
#[command(
    long_about = "Generates companion C# partial declarations for annotated members of a compilation snapshot and checks that the callbacks they call are implemented"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (suppress non-error output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Set log level
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Configuration file (defaults to ./partialgen.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate partial declarations from compilation snapshots
    Generate {
        /// Snapshot file or directory of *.json snapshots
        input: PathBuf,
        /// Directory receiving generated files
        #[arg(short, long, default_value = "Generated")]
        output: PathBuf,
        /// Remove stale generated files from the output directory
        #[arg(long)]
        clean: bool,
    },
    /// Report missing callbacks and invalid annotations
    Check {
        /// Snapshot file or directory of *.json snapshots
        input: PathBuf,
        /// Analyze declarations on worker threads
        #[arg(long)]
        parallel: bool,
    },
    /// Add stubs for missing callbacks
    Fix {
        /// Snapshot file or directory of *.json snapshots
        input: PathBuf,
        /// Write the fixed snapshot back instead of printing the fixes
        #[arg(long)]
        write: bool,
    },
    /// Write a default partialgen.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        path: Option<PathBuf>,
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the current pass");
            on_interrupt.cancel();
        }
    });

    match &cli.command {
        Commands::Generate { input, output, clean } => {
            let config = load_config(cli.config.as_deref())?;
            handle_generate_command(config, input, output, *clean, cli.format, cancel).await
        }
        Commands::Check { input, parallel } => {
            let mut config = load_config(cli.config.as_deref())?;
            config.analysis.parallel |= *parallel;
            handle_check_command(config, input, cli.format, cancel).await
        }
        Commands::Fix { input, write } => {
            let config = load_config(cli.config.as_deref())?;
            handle_fix_command(config, input, *write, cli.format, cancel).await
        }
        Commands::Init { path, force } => handle_init_command(path.as_deref(), *force).await,
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        match &cli.log_level {
            Some(LogLevel::Error) => log::LevelFilter::Error,
            Some(LogLevel::Warn) => log::LevelFilter::Warn,
            Some(LogLevel::Info) => log::LevelFilter::Info,
            Some(LogLevel::Debug) => log::LevelFilter::Debug,
            Some(LogLevel::Trace) => log::LevelFilter::Trace,
            None => log::LevelFilter::Warn,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();
}

/// The explicit config file, else ./partialgen.toml, else defaults
fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if Path::new(CONFIG_FILE).exists() => PathBuf::from(CONFIG_FILE),
        None => {
            debug!("No {} found, using default configuration", CONFIG_FILE);
            return Ok(GeneratorConfig::default());
        }
    };
    let config =
        GeneratorConfig::from_file(&path).with_context(|| format!("Invalid configuration in '{}'", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

async fn handle_generate_command(
    config: GeneratorConfig,
    input: &Path,
    output: &Path,
    clean: bool,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let snapshots = snapshots::load_all(input).await?;
    let per_snapshot_dirs = snapshots.len() > 1;
    let extension = config.emit.file_extension.clone();
    let mut pipeline = GenerationPipeline::new(config);
    let mut reports = Vec::with_capacity(snapshots.len());

    for snapshot in snapshots {
        let directory = if per_snapshot_dirs {
            output.join(snapshot.stem())
        } else {
            output.to_path_buf()
        };

        let LoadedSnapshot { path, compilation } = snapshot;
        let token = cancel.clone();
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = pipeline.run(&compilation, &token);
            (pipeline, result)
        })
        .await
        .context("Generation task failed")?;
        pipeline = returned;
        let generated = result.map_err(|_| anyhow!("Generation cancelled"))?;

        tokio::fs::create_dir_all(&directory)
            .await
            .with_context(|| format!("Failed to create '{}'", directory.display()))?;
        if clean {
            remove_stale_files(&directory, &extension).await?;
        }

        let mut files = Vec::with_capacity(generated.artifacts.len());
        for artifact in &generated.artifacts {
            let target = directory.join(&artifact.hint_name);
            tokio::fs::write(&target, &artifact.text)
                .await
                .with_context(|| format!("Failed to write '{}'", target.display()))?;
            files.push(artifact.hint_name.clone());
        }
        info!("Wrote {} files for {}", files.len(), path.display());

        reports.push(GenerateReport {
            snapshot: path.display().to_string(),
            output_directory: directory.display().to_string(),
            files,
            pass: generated.report,
        });
    }

    report::emit(format, &reports, |reports| report::print_generate(reports))
}

/// Delete `*.g.<extension>` files left over from earlier runs
async fn remove_stale_files(directory: &Path, extension: &str) -> Result<()> {
    let suffix = format!(".g.{}", extension);
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .with_context(|| format!("Failed to read '{}'", directory.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let generated = path
            .file_name()
            .map_or(false, |name| name.to_string_lossy().ends_with(&suffix));
        if generated && entry.file_type().await?.is_file() {
            debug!("Removing stale {}", path.display());
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove '{}'", path.display()))?;
        }
    }
    Ok(())
}

async fn handle_check_command(
    config: GeneratorConfig,
    input: &Path,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let snapshots = snapshots::load_all(input).await?;
    let settings = config.analysis.clone();

    let reports = tokio::task::spawn_blocking(move || -> Result<Vec<CheckReport>> {
        let host = AnalysisHost::with_settings(settings);
        let mut reports = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            let diagnostics = host
                .analyze(&snapshot.compilation, &cancel)
                .map_err(|_| anyhow!("Analysis cancelled"))?;
            reports.push(CheckReport {
                snapshot: snapshot.path.display().to_string(),
                diagnostics: diagnostics.iter().map(DiagnosticRecord::from).collect(),
            });
        }
        Ok(reports)
    })
    .await
    .context("Analysis task failed")??;

    report::emit(format, &reports, |reports| report::print_check(reports))?;

    let errors: usize = reports.iter().map(|r| r.diagnostics.len()).sum();
    if errors > 0 {
        bail!("{} diagnostics reported", errors);
    }
    Ok(())
}

async fn handle_fix_command(
    config: GeneratorConfig,
    input: &Path,
    write: bool,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let snapshots = snapshots::load_all(input).await?;
    let options = config.emit.clone();
    let settings = config.analysis.clone();

    let fixed = tokio::task::spawn_blocking(move || -> Result<Vec<(FixReport, Option<String>)>> {
        let host = AnalysisHost::with_settings(settings);
        let fixer = AddCallbackStubFix::new();
        let mut results = Vec::with_capacity(snapshots.len());

        for snapshot in snapshots {
            let diagnostics = host
                .analyze(&snapshot.compilation, &cancel)
                .map_err(|_| anyhow!("Analysis cancelled"))?;

            let mut compilation = snapshot.compilation;
            let mut fixes = Vec::new();
            for diagnostic in diagnostics.iter().filter(|d| fixer.can_fix(d)) {
                cancel.check().map_err(|_| anyhow!("Fix cancelled"))?;
                let fix = fixer
                    .compute(&compilation, diagnostic, &options)
                    .with_context(|| format!("Could not fix {} at {}", diagnostic.id(), diagnostic.location))?;
                compilation = fix
                    .apply(&compilation)
                    .with_context(|| format!("Could not apply '{}'", fix.title))?;
                fixes.push(fix);
            }

            let json = if !fixes.is_empty() {
                Some(compilation.to_json().context("Failed to serialize fixed snapshot")?)
            } else {
                None
            };
            results.push((
                FixReport {
                    snapshot: snapshot.path.display().to_string(),
                    written_to: None,
                    fixes,
                },
                json,
            ));
        }
        Ok(results)
    })
    .await
    .context("Fix task failed")??;

    let mut reports = Vec::with_capacity(fixed.len());
    for (mut fix_report, json) in fixed {
        if let (true, Some(json)) = (write, json) {
            tokio::fs::write(&fix_report.snapshot, json)
                .await
                .with_context(|| format!("Failed to write '{}'", fix_report.snapshot))?;
            info!("Applied {} fixes to {}", fix_report.fixes.len(), fix_report.snapshot);
            fix_report.written_to = Some(fix_report.snapshot.clone());
        }
        reports.push(fix_report);
    }

    report::emit(format, &reports, |reports| report::print_fix(reports))
}

async fn handle_init_command(path: Option<&Path>, force: bool) -> Result<()> {
    let directory = path.unwrap_or_else(|| Path::new("."));
    let target = directory.join(CONFIG_FILE);

    if target.exists() && !force {
        bail!("'{}' already exists; pass --force to overwrite it", target.display());
    }

    tokio::fs::create_dir_all(directory)
        .await
        .with_context(|| format!("Failed to create '{}'", directory.display()))?;
    let content = GeneratorConfig::default()
        .to_toml_string()
        .context("Failed to render default configuration")?;
    tokio::fs::write(&target, content)
        .await
        .with_context(|| format!("Failed to write '{}'", target.display()))?;

    println!("✅ Wrote {}", target.display());
    Ok(())
}
