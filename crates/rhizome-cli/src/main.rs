//! Rhizome CLI: map the import dependencies of a Python project.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use tracing_subscriber::EnvFilter;

use rhizome_core::config::AnalysisConfig;
use rhizome_core::output::{timestamp_now, write_artifacts, ArtifactPaths};
use rhizome_core::pipeline::{self, AnalysisResult};
use rhizome_core::AnalysisError;

#[derive(Parser)]
#[command(
    name = "rhizome",
    version,
    about = "Rhizome - Map the import dependencies of a Python project"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a project and write the dependency graph, metrics and report
    Analyze {
        /// Project root (defaults to the nearest ancestor holding a root marker
        /// such as .git or pyproject.toml)
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Report path; the JSON graph and YAML metrics are written beside it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Additional gitignore-style patterns to exclude
        #[arg(long)]
        exclude: Vec<String>,

        /// Only report config files passed to known opener calls
        #[arg(long)]
        no_bare_literals: bool,

        /// Number of modules listed in the fan-in/fan-out rankings
        #[arg(long, default_value = "20")]
        top_k: usize,

        /// Show per-phase timing breakdown and debug logs
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long)]
        quiet: bool,
    },
}

fn init_logging(config: &AnalysisConfig) {
    let level = if config.quiet {
        "error"
    } else if config.verbose {
        "debug"
    } else {
        "warn"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            project_root,
            output,
            exclude,
            no_bare_literals,
            top_k,
            verbose,
            quiet,
        } => {
            let config = AnalysisConfig {
                repo_path: project_root
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default(),
                output_path: output.map(|p| p.to_string_lossy().to_string()),
                exclude_patterns: exclude,
                scan_bare_literals: !no_bare_literals,
                top_k,
                verbose,
                quiet,
                ..Default::default()
            };
            init_logging(&config);

            let outcome = if config.quiet {
                run_quiet(&config)
            } else {
                run_with_progress(&config)
            };

            match outcome {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    report_error(&e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn report_error(e: &AnalysisError) {
    eprintln!("{}: {e}", style("error").red().bold());
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        eprintln!("  {}: {cause}", style("caused by").dim());
        source = std::error::Error::source(cause);
    }
}

fn report_path(config: &AnalysisConfig, result: &AnalysisResult) -> PathBuf {
    config
        .output_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| pipeline::default_report_path(&result.project_root))
}

fn emit(config: &AnalysisConfig, result: &AnalysisResult) -> Result<ArtifactPaths, AnalysisError> {
    let doc = result.document(&timestamp_now());
    write_artifacts(&doc, &report_path(config, result))
}

fn run_quiet(config: &AnalysisConfig) -> Result<(), AnalysisError> {
    let result = pipeline::run_pipeline(config, None)?;
    emit(config, &result)?;
    Ok(())
}

fn run_with_progress(config: &AnalysisConfig) -> Result<(), AnalysisError> {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(spinner.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message("Initialising...");
    pb.enable_steady_tick(Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let result = match pipeline::run_pipeline(config, Some(progress)) {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.set_message("Writing artifacts");
    let written = emit(config, &result);
    pb.finish_and_clear();
    let paths = written?;

    print_summary(&result, config.verbose);
    println!("\n  {}", style("Artifacts written:").green());
    for path in [&paths.report_md, &paths.graph_json, &paths.metrics_yaml] {
        println!("    {}", display_path(path));
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult, verbose: bool) {
    let metrics = &result.metrics;
    let summary = &metrics.summary;

    println!(
        "\n{}  Rhizome Analysis: {}",
        style("✓").green().bold(),
        style(
            result
                .project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        )
        .bold()
    );
    println!("  {:<14} {}", "Modules:", summary.internal_modules);
    println!("  {:<14} {}", "External:", summary.external_packages);
    println!("  {:<14} {}", "Config files:", summary.config_files);
    println!("  {:<14} {}", "Edges:", summary.total_edges);
    println!("  {:<14} {}", "Entry points:", metrics.entrypoints.roots.len());

    let cycles = metrics.cycles.scc_count + metrics.cycles.self_cycle_count;
    let cycle_text = if cycles == 0 {
        style(cycles.to_string()).green()
    } else {
        style(cycles.to_string()).yellow()
    };
    println!("  {:<14} {}", "Cycles:", cycle_text);

    let issue_text = if summary.issues == 0 {
        style(summary.issues.to_string()).green()
    } else {
        style(summary.issues.to_string()).yellow()
    };
    println!("  {:<14} {}", "Issues:", issue_text);
    println!("  {:<14} {:.1}ms", "Duration:", result.total_ms);

    if verbose {
        println!("\n  Phase Timings:");
        for (phase, secs) in &result.timings {
            println!("    {:<14} {:.1}ms", phase, secs * 1000.0);
        }
        debug!("{} modules indexed", result.index.len());
    }
}

fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(|p| p.display().to_string()))
        .unwrap_or_else(|| path.display().to_string())
}
