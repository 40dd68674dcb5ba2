//! CLI for gating CI on a package version and reporting violations across a Snyk group

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use snyk_version_gate::{
    check_report_file, run_report, GateOutcome, ReportOutcome, ScanConfig,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gate passed / run completed
const EXIT_OK: i32 = 0;
/// The gate found a violation
const EXIT_VIOLATION: i32 = 1;
/// Missing input, bad configuration or an aborted remote run
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "snyk-gate")]
#[command(about = "Fail CI or report when a package resolves above an allowed version in Snyk results", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Package to check (overrides the config file)
    #[arg(long, global = true)]
    package: Option<String>,

    /// Highest allowed version, inclusive (overrides the config file)
    #[arg(long, global = true)]
    max_version: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a local Snyk JSON report (exit code based)
    Check {
        /// Snyk JSON output file
        #[arg(short = 'f', long, default_value = "snyk-results.json")]
        file: PathBuf,
    },

    /// Scan every project in a Snyk group and export violations to CSV
    Report {
        /// Snyk group to scan (overrides the config file)
        #[arg(short = 'g', long)]
        group_id: Option<String>,

        /// Directory the CSV report is written to
        #[arg(short = 'o', long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Failed to load config: {:#}", "Error:".red().bold(), e);
            process::exit(EXIT_FATAL);
        }
    };

    if let Some(package) = &cli.package {
        config.gate.target_package = package.clone();
    }
    if let Some(max_version) = &cli.max_version {
        config.gate.max_version = max_version.clone();
    }

    let code = match cli.command {
        Commands::Check { file } => run_check(&file, &config),
        Commands::Report {
            group_id,
            output_dir,
        } => {
            if let Some(group_id) = group_id {
                config.snyk.group_id = group_id;
            }
            run_remote_report(&config, &output_dir).await
        }
    };

    process::exit(code);
}

fn run_check(file: &Path, config: &ScanConfig) -> i32 {
    if let Err(e) = config.gate.validate() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        return EXIT_FATAL;
    }

    println!(
        "Checking Snyk dependencies for '{}' version > '{}'...",
        config.gate.target_package, config.gate.max_version
    );

    match check_report_file(file, &config.gate) {
        Ok(GateOutcome::Pass { scanned }) => {
            println!(
                "{} No violations found in {} records. All clear!",
                "Success:".green().bold(),
                scanned
            );
            EXIT_OK
        }
        Ok(GateOutcome::Fail(violation)) => {
            println!("{}", "Gating violation found!".red().bold());
            println!("Package: {}", violation);
            println!("Dependency path: {}", violation.reason());
            println!(
                "Rule: Version must be less than or equal to {}",
                config.gate.max_version
            );
            EXIT_VIOLATION
        }
        Err(e) => {
            error!("Local gate aborted: {}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            EXIT_FATAL
        }
    }
}

async fn run_remote_report(config: &ScanConfig, output_dir: &Path) -> i32 {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Walking Snyk organizations and projects...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = run_report(config, output_dir).await;

    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            display_report(&outcome);
            EXIT_OK
        }
        Err(e) => {
            error!("Report generation aborted: {}", e);
            eprintln!("{} Report failed: {}", "Error:".red().bold(), e);
            EXIT_FATAL
        }
    }
}

fn display_report(outcome: &ReportOutcome) {
    let run = &outcome.run;

    println!("\n{}", "=== Snyk Version Report ===".bold());
    println!("Organizations scanned: {}", run.organizations_scanned);
    println!("Projects scanned: {}", run.projects_scanned);
    println!("Dependencies scanned: {}", run.dependencies_scanned);

    if run.invalid_versions > 0 {
        println!(
            "{}",
            format!("Unparsable versions skipped: {}", run.invalid_versions).yellow()
        );
    }

    if !run.skipped.is_empty() {
        println!("{}", "Skipped:".yellow());
        for node in &run.skipped {
            println!("  - {} {}: {}", node.level, node.name, node.error);
        }
    }

    match &outcome.export {
        Some(path) => {
            println!(
                "\n{} Found {} violations. Report: {}",
                "Violations:".red().bold(),
                run.violations.len(),
                path.display()
            );
        }
        None => {
            println!(
                "\n{} No violations found across all projects.",
                "Success:".green().bold()
            );
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ScanConfig> {
    match path {
        Some(path) => ScanConfig::from_file(path)
            .with_context(|| format!("reading {}", path.display())),
        None => Ok(ScanConfig::default()),
    }
}
