//! Remote tracker boundary.
//!
//! [`Tracker`] is the seam the matcher and orchestrator talk through; the
//! production implementation spawns the `gh` CLI, tests substitute their own.
//! All methods perform exactly one remote call; retry policy lives in
//! [`crate::retry`], not here.

use std::io::Write;
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Fields requested from issue searches. Kept minimal: matching only ever
/// needs the number and the title.
pub const SEARCH_FIELDS: &[&str] = &["number", "title"];

/// One issue as returned by a tracker search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
}

/// Remote tracker operations, one blocking call each.
pub trait Tracker {
    /// Search open issues; ordered, possibly empty.
    fn search_issues(
        &self,
        repository: &str,
        search_text: &str,
        fields: &[&str],
    ) -> Result<Vec<IssueSummary>>;

    /// Create an issue, returning its number.
    fn create_issue(&self, repository: &str, title: &str, body: &str, labels: &str) -> Result<u64>;

    /// Replace an existing issue's body.
    fn update_issue(&self, repository: &str, number: u64, body: &str) -> Result<()>;

    /// Attach labels to an existing issue. Separate from the body write so a
    /// label failure after a successful update surfaces as a partial write,
    /// not a rollback.
    fn add_labels(&self, repository: &str, number: u64, labels: &str) -> Result<()>;

    /// Fetch an issue's current body.
    fn issue_body(&self, repository: &str, number: u64) -> Result<String>;
}

/// Tracker backed by the GitHub CLI.
#[derive(Debug, Default)]
pub struct GhTracker;

impl GhTracker {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        tracing::debug!("gh {}", args.join(" "));
        let output = Command::new("gh")
            .args(args)
            .output()
            .context("Failed to spawn gh (is the GitHub CLI installed?)")?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("gh {} failed: {}", args.first().unwrap_or(&"?"), stderr.trim());
        }
    }

    /// `gh` takes issue bodies by file, which sidesteps argv length limits
    /// and shell quoting for multi-line markdown.
    fn body_file(&self, body: &str) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new().context("Failed to create body file")?;
        file.write_all(body.as_bytes())
            .context("Failed to write body file")?;
        Ok(file)
    }
}

impl Tracker for GhTracker {
    fn search_issues(
        &self,
        repository: &str,
        search_text: &str,
        fields: &[&str],
    ) -> Result<Vec<IssueSummary>> {
        let fields = fields.join(",");
        let output = self.run(&[
            "issue",
            "list",
            "--repo",
            repository,
            "--state",
            "open",
            "--search",
            search_text,
            "--json",
            &fields,
            "--limit",
            "20",
        ])?;

        let trimmed = output.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Vec::new());
        }
        serde_json::from_str(trimmed).context("Unexpected search response from gh")
    }

    fn create_issue(&self, repository: &str, title: &str, body: &str, labels: &str) -> Result<u64> {
        let file = self.body_file(body)?;
        let file_path = file.path().to_string_lossy().into_owned();

        let mut args: Vec<&str> = vec![
            "issue",
            "create",
            "--repo",
            repository,
            "--title",
            title,
            "--body-file",
            &file_path,
        ];
        if !labels.is_empty() {
            args.push("--label");
            args.push(labels);
        }

        let output = self.run(&args)?;

        // gh prints the new issue URL as its last line
        let number = output
            .lines()
            .last()
            .and_then(|url| url.trim().rsplit('/').next())
            .and_then(|n| n.parse().ok());
        number.with_context(|| format!("Could not parse issue number from gh output: {output:?}"))
    }

    fn update_issue(&self, repository: &str, number: u64, body: &str) -> Result<()> {
        let file = self.body_file(body)?;
        let file_path = file.path().to_string_lossy().into_owned();
        let number = number.to_string();

        self.run(&[
            "issue",
            "edit",
            &number,
            "--repo",
            repository,
            "--body-file",
            &file_path,
        ])?;
        Ok(())
    }

    fn add_labels(&self, repository: &str, number: u64, labels: &str) -> Result<()> {
        let number = number.to_string();
        self.run(&[
            "issue",
            "edit",
            &number,
            "--repo",
            repository,
            "--add-label",
            labels,
        ])?;
        Ok(())
    }

    fn issue_body(&self, repository: &str, number: u64) -> Result<String> {
        let number = number.to_string();
        let output = self.run(&[
            "issue",
            "view",
            &number,
            "--repo",
            repository,
            "--json",
            "body",
        ])?;

        let value: serde_json::Value =
            serde_json::from_str(output.trim()).context("Unexpected view response from gh")?;
        Ok(value["body"].as_str().unwrap_or_default().to_string())
    }
}
