//! Prevention-effectiveness log.
//!
//! One CSV line per orchestrator outcome: `timestamp,action,repository,
//! issue_number`. Append-only; the only mutation is the retention sweep.
//! Recording must never take the orchestrator down: a failed write is a
//! warning, not an error.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

/// Orchestrator outcome being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NewIssue,
    DuplicateUpdate,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::NewIssue => write!(f, "new_issue"),
            Action::DuplicateUpdate => write!(f, "duplicate_update"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_issue" => Ok(Action::NewIssue),
            "duplicate_update" => Ok(Action::DuplicateUpdate),
            _ => anyhow::bail!("Unknown metric action: '{}'", s),
        }
    }
}

/// Aggregate over a summarize window.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub new_issues: usize,
    pub duplicate_updates: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.new_issues + self.duplicate_updates
    }

    /// Share of reports that landed on an existing issue instead of
    /// creating a new one.
    pub fn deduplicated_share(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.duplicate_updates as f64 / self.total() as f64
    }
}

#[derive(Debug)]
pub struct MetricsRecorder {
    path: PathBuf,
}

impl MetricsRecorder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one event. Infallible by contract: failures are logged.
    pub fn record(&self, action: Action, repository: &str, issue_number: u64) {
        if let Err(e) = self.try_record(action, repository, issue_number) {
            tracing::warn!("Metrics write failed ({}): {}", self.path.display(), e);
        }
    }

    fn try_record(&self, action: Action, repository: &str, issue_number: u64) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{},{},{},{}",
            Utc::now().to_rfc3339(),
            action,
            repository,
            issue_number
        )
    }

    /// Count events newer than `window`.
    pub fn summarize(&self, window: Duration) -> Summary {
        self.summarize_since(Utc::now() - window)
    }

    fn summarize_since(&self, cutoff: DateTime<Utc>) -> Summary {
        let mut summary = Summary::default();
        for (timestamp, action) in self.parse_lines() {
            if timestamp >= cutoff {
                match action {
                    Action::NewIssue => summary.new_issues += 1,
                    Action::DuplicateUpdate => summary.duplicate_updates += 1,
                }
            }
        }
        summary
    }

    /// Drop entries older than `retention`, rewriting the log. Unparseable
    /// lines are dropped too. Returns (removed, kept).
    pub fn sweep(&self, retention: Duration) -> (usize, usize) {
        self.sweep_before(Utc::now() - retention)
    }

    fn sweep_before(&self, cutoff: DateTime<Utc>) -> (usize, usize) {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return (0, 0),
        };

        let total = content.lines().count();
        let kept: Vec<&str> = content
            .lines()
            .filter(|line| {
                parse_line(line).is_some_and(|(timestamp, _)| timestamp >= cutoff)
            })
            .collect();
        let removed = total - kept.len();

        if removed > 0 {
            let mut rewritten = kept.join("\n");
            if !rewritten.is_empty() {
                rewritten.push('\n');
            }
            if let Err(e) = std::fs::write(&self.path, rewritten) {
                tracing::warn!("Metrics sweep failed ({}): {}", self.path.display(), e);
                return (0, total);
            }
        }
        (removed, kept.len())
    }

    fn parse_lines(&self) -> Vec<(DateTime<Utc>, Action)> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        content.lines().filter_map(parse_line).collect()
    }
}

fn parse_line(line: &str) -> Option<(DateTime<Utc>, Action)> {
    let mut parts = line.splitn(4, ',');
    let timestamp = DateTime::parse_from_rfc3339(parts.next()?).ok()?;
    let action: Action = parts.next()?.parse().ok()?;
    Some((timestamp.with_timezone(&Utc), action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn recorder_in(dir: &TempDir) -> MetricsRecorder {
        MetricsRecorder::new(dir.path().join("metrics.csv"))
    }

    #[test]
    fn test_record_appends_csv_line() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder_in(&dir);

        recorder.record(Action::NewIssue, "acme/app", 42);
        recorder.record(Action::DuplicateUpdate, "acme/app", 42);

        let content = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(",new_issue,acme/app,42"));
        assert!(lines[1].ends_with(",duplicate_update,acme/app,42"));
    }

    #[test]
    fn test_record_never_panics_on_unwritable_path() {
        let recorder = MetricsRecorder::new(PathBuf::from("/dev/null/not/a/dir/metrics.csv"));
        recorder.record(Action::NewIssue, "acme/app", 1);
    }

    #[test]
    fn test_summarize_counts_window_only() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder_in(&dir);
        let path = dir.path().join("metrics.csv");

        std::fs::write(
            &path,
            "2026-01-01T00:00:00+00:00,new_issue,acme/app,1\n\
             2026-06-01T00:00:00+00:00,new_issue,acme/app,2\n\
             2026-06-02T00:00:00+00:00,duplicate_update,acme/app,2\n\
             garbage line\n",
        )
        .unwrap();

        let summary = recorder.summarize_since("2026-05-01T00:00:00+00:00".parse().unwrap());
        assert_eq!(summary.new_issues, 1);
        assert_eq!(summary.duplicate_updates, 1);
        assert_eq!(summary.deduplicated_share(), 0.5);
    }

    #[test]
    fn test_sweep_drops_old_and_unparseable() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder_in(&dir);
        let path = dir.path().join("metrics.csv");

        std::fs::write(
            &path,
            "2026-01-01T00:00:00+00:00,new_issue,acme/app,1\n\
             not,a,metric,line\n\
             2026-06-01T00:00:00+00:00,duplicate_update,acme/app,2\n",
        )
        .unwrap();

        let (removed, kept) = recorder.sweep_before("2026-05-01T00:00:00+00:00".parse().unwrap());
        assert_eq!(removed, 2);
        assert_eq!(kept, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "2026-06-01T00:00:00+00:00,duplicate_update,acme/app,2\n");
    }

    #[test]
    fn test_sweep_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder_in(&dir);
        assert_eq!(recorder.sweep(Duration::days(30)), (0, 0));
    }

    #[test]
    fn test_empty_summary_share() {
        assert_eq!(Summary::default().deduplicated_share(), 0.0);
    }
}
