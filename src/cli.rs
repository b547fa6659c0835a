//! CLI implementation for dupgate

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use dupgate::config::Config;
use dupgate::error::Error;
use dupgate::gh::GhTracker;
use dupgate::report::{self, ReportRequest, Reporter};

// Exit codes
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ValidationError = 2,
    RemoteFailure = 3,
}

#[derive(Parser)]
#[command(name = "dupgate")]
#[command(about = "Duplicate-aware issue reporting for automated analysis pipelines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress human-facing summaries
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an equivalent open issue exists; print its number or
    /// an empty string
    DetectDuplicate {
        /// Target repository (owner/name)
        repo: String,
        /// Candidate issue title
        title: String,
        /// Candidate issue body
        body: String,
        /// Identifier such as a commit hash
        identifier: Option<String>,
    },
    /// Update the duplicate if one exists, otherwise create a new issue;
    /// print the resulting issue number
    CreateOrUpdate {
        /// Target repository (owner/name)
        repo: String,
        /// Issue title
        title: String,
        /// File containing the issue body
        body_file: PathBuf,
        /// Comma-separated labels (may be empty)
        labels: String,
        /// Identifier such as a commit hash
        identifier: Option<String>,
    },
    /// Print a deterministic issue title (prefix + commit hash, PR number,
    /// or timestamp)
    GenerateTitle {
        /// Title prefix, e.g. "Security Scan - "
        prefix: String,
        /// Target repository (owner/name)
        repo: String,
    },
    /// Purge expired cache entries and sweep the metrics log
    CleanupCache,
    /// Summarize the prevention-metrics log
    Metrics {
        /// Window to summarize, in days
        #[arg(long, default_value = "30")]
        window_days: u64,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::DetectDuplicate {
            repo,
            title,
            body,
            identifier,
        } => cmd_detect(&config, &repo, &title, &body, identifier.as_deref()),
        Commands::CreateOrUpdate {
            repo,
            title,
            body_file,
            labels,
            identifier,
        } => cmd_create_or_update(
            &config,
            &repo,
            &title,
            &body_file,
            &labels,
            identifier.as_deref(),
        ),
        Commands::GenerateTitle { prefix, repo } => cmd_generate_title(&prefix, &repo),
        Commands::CleanupCache => cmd_cleanup(&config, cli.quiet),
        Commands::Metrics { window_days } => cmd_metrics(&config, window_days),
    }
}

/// Map an error to the process exit code: validation and remote failures
/// are distinguishable by machine consumers.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<Error>() {
        Some(Error::Validation(_)) => ExitCode::ValidationError as i32,
        Some(Error::RemoteExhausted { .. }) => ExitCode::RemoteFailure as i32,
        None => ExitCode::GeneralError as i32,
    }
}

fn cmd_detect(
    config: &Config,
    repo: &str,
    title: &str,
    body: &str,
    identifier: Option<&str>,
) -> Result<()> {
    let tracker = GhTracker::new();
    let reporter = Reporter::new(config, &tracker);

    match reporter.detect_duplicate(repo, title, body, identifier)? {
        Some(candidate) => {
            tracing::debug!(
                "Matched issue #{} via {}",
                candidate.issue.number,
                candidate.strategy
            );
            println!("{}", candidate.issue.number);
        }
        None => println!(),
    }
    Ok(())
}

fn cmd_create_or_update(
    config: &Config,
    repo: &str,
    title: &str,
    body_file: &PathBuf,
    labels: &str,
    identifier: Option<&str>,
) -> Result<()> {
    let body = std::fs::read_to_string(body_file).map_err(|e| {
        Error::validation(format!("Cannot read body file {}: {}", body_file.display(), e))
    })?;

    let tracker = GhTracker::new();
    let reporter = Reporter::new(config, &tracker);

    let number = reporter.create_or_update(&ReportRequest {
        repository: repo,
        title,
        body: &body,
        labels,
        identifier,
    })?;

    println!("{}", number);
    Ok(())
}

fn cmd_generate_title(prefix: &str, repo: &str) -> Result<()> {
    report::validate_repository(repo)?;
    println!("{}", report::generate_title(prefix));
    Ok(())
}

fn cmd_cleanup(config: &Config, quiet: bool) -> Result<()> {
    let tracker = GhTracker::new();
    let reporter = Reporter::new(config, &tracker);

    let ((cache_removed, cache_kept), (metrics_removed, _)) = reporter.cleanup();

    if !quiet {
        println!(
            "Removed {} expired cache entries ({} kept)",
            cache_removed, cache_kept
        );
        if metrics_removed > 0 {
            println!("Dropped {} metrics entries past retention", metrics_removed);
        }
    }
    Ok(())
}

fn cmd_metrics(config: &Config, window_days: u64) -> Result<()> {
    let tracker = GhTracker::new();
    let reporter = Reporter::new(config, &tracker);

    let summary = reporter
        .metrics()
        .summarize(chrono::Duration::days(window_days as i64));

    println!("{}", format!("Issue report metrics (last {} days)", window_days).bold());
    println!("  New issues:        {}", summary.new_issues);
    println!("  Duplicate updates: {}", summary.duplicate_updates);
    println!(
        "  Deduplicated:      {}",
        format!("{:.1}%", summary.deduplicated_share() * 100.0).cyan()
    );
    Ok(())
}
