//! Orchestration: decide between updating an existing issue and filing a
//! new one.
//!
//! `create_or_update` is the single write path: validate → match → write →
//! invalidate cache → record metric. Remote failures (after retries) and
//! invalid input terminate the run; a failed label attachment after a
//! successful body write does not.

use std::process::Command;

use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::QueryCache;
use crate::config::Config;
use crate::error::Error;
use crate::gh::Tracker;
use crate::matcher::{Candidate, DuplicateMatcher, MatchRequest};
use crate::metrics::{Action, MetricsRecorder};
use crate::retry::RetryExecutor;

static REPOSITORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*/[A-Za-z0-9_.-]+$").expect("static regex")
});

/// A candidate report heading for the tracker.
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'a> {
    pub repository: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    /// Comma-separated, possibly empty
    pub labels: &'a str,
    /// Typically a commit hash
    pub identifier: Option<&'a str>,
}

/// Ties the matcher, cache, retry policy and metrics log to one tracker.
pub struct Reporter<'a> {
    config: &'a Config,
    tracker: &'a dyn Tracker,
    cache: QueryCache,
    retry: RetryExecutor,
    metrics: MetricsRecorder,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a Config, tracker: &'a dyn Tracker) -> Self {
        Self {
            config,
            tracker,
            cache: QueryCache::from_config(config),
            retry: RetryExecutor::from_config(config),
            metrics: MetricsRecorder::new(config.metrics_path()),
        }
    }

    /// Run the match chain only; no writes, no metrics.
    pub fn detect_duplicate(
        &self,
        repository: &str,
        title: &str,
        body: &str,
        identifier: Option<&str>,
    ) -> Result<Option<Candidate>> {
        validate_repository(repository)?;
        validate_title(title)?;

        let matcher = DuplicateMatcher::new(self.config, &self.cache, &self.retry);
        matcher.find_duplicate(
            self.tracker,
            &MatchRequest {
                repository,
                title,
                body,
                identifier,
            },
        )
    }

    /// Update the duplicate if one exists, otherwise create a new issue.
    /// Returns the issue number either way.
    pub fn create_or_update(&self, request: &ReportRequest) -> Result<u64> {
        validate_repository(request.repository)?;
        validate_title(request.title)?;

        let matcher = DuplicateMatcher::new(self.config, &self.cache, &self.retry);
        let candidate = matcher.find_duplicate(
            self.tracker,
            &MatchRequest {
                repository: request.repository,
                title: request.title,
                body: request.body,
                identifier: request.identifier,
            },
        )?;

        let (number, action) = match candidate {
            Some(candidate) => {
                tracing::info!(
                    "Duplicate of issue #{} (via {}), updating",
                    candidate.issue.number,
                    candidate.strategy
                );
                self.update_existing(candidate.issue.number, request)?;
                (candidate.issue.number, Action::DuplicateUpdate)
            }
            None => {
                let number = self.retry.execute("issue create", || {
                    self.tracker.create_issue(
                        request.repository,
                        request.title,
                        request.body,
                        request.labels,
                    )
                })?;
                tracing::info!("Created issue #{}", number);
                (number, Action::NewIssue)
            }
        };

        // Later queries in this run must observe the write
        if self.config.cache_invalidation {
            self.cache.invalidate(request.repository);
        }
        self.metrics.record(action, request.repository, number);

        Ok(number)
    }

    fn update_existing(&self, number: u64, request: &ReportRequest) -> Result<()> {
        let unchanged = match self.retry.execute("issue body fetch", || {
            self.tracker.issue_body(request.repository, number)
        }) {
            Ok(current) => content_hash(&current) == content_hash(request.body),
            // Can't tell; assume the update is needed
            Err(e) => {
                tracing::debug!("Body fetch for #{} failed, updating anyway: {}", number, e);
                false
            }
        };

        if unchanged {
            tracing::info!("Issue #{} body unchanged, skipping edit", number);
        } else {
            self.retry.execute("issue update", || {
                self.tracker
                    .update_issue(request.repository, number, request.body)
            })?;
        }

        // The body write already landed; a label failure is a partial write,
        // reported but not fatal and never rolled back.
        if !request.labels.is_empty() {
            if let Err(e) = self.retry.execute("label attach", || {
                self.tracker
                    .add_labels(request.repository, number, request.labels)
            }) {
                tracing::warn!("Issue #{} updated but labels not attached: {}", number, e);
            }
        }

        Ok(())
    }

    /// Expired/corrupt cache entries plus metrics past retention.
    /// Returns ((cache removed, cache kept), (metrics removed, metrics kept)).
    pub fn cleanup(&self) -> ((usize, usize), (usize, usize)) {
        let cache = self.cache.cleanup();
        let metrics = self
            .metrics
            .sweep(chrono::Duration::days(self.config.metrics_retention_days as i64));
        (cache, metrics)
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }
}

/// Deterministic issue title: prefix + commit hash when inside a git
/// checkout, else the PR number from `GITHUB_PR_NUMBER`, else a UTC
/// timestamp, in that priority order.
pub fn generate_title(prefix: &str) -> String {
    if let Some(commit) = current_commit() {
        return format!("{}{}", prefix, commit);
    }

    if let Ok(pr_number) = std::env::var("GITHUB_PR_NUMBER") {
        if !pr_number.is_empty() {
            return format!("{}PR #{}", prefix, pr_number);
        }
    }

    format!("{}{}", prefix, Utc::now().format("%Y%m%d-%H%M%S"))
}

fn current_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!commit.is_empty()).then_some(commit)
}

/// Body fingerprint ignoring whitespace differences, so a re-rendered but
/// semantically identical report does not trigger an edit.
pub fn content_hash(body: &str) -> blake3::Hash {
    let normalized = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    blake3::hash(normalized.as_bytes())
}

pub fn validate_repository(repository: &str) -> Result<(), Error> {
    if REPOSITORY_RE.is_match(repository) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Invalid repository '{}' (expected owner/name)",
            repository
        )))
    }
}

pub fn validate_title(title: &str) -> Result<(), Error> {
    if title.trim().is_empty() {
        return Err(Error::validation("Title must not be empty"));
    }
    Ok(())
}
