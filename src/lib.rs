//! # dupgate - Duplicate-aware issue reporting
//!
//! A gate between recurring analysis pipelines (security scans, CI checks)
//! and an issue tracker: when the same condition is detected run after run,
//! the existing open issue is updated instead of a new one being filed.
//!
//! ## How a report is matched
//!
//! An ordered strategy chain, short-circuiting on the first hit:
//!
//! 1. **Exact title** - open issues whose title equals the candidate's
//! 2. **Identifier** - the supplied identifier (commit hash) in title or body
//! 3. **Keywords** - a bounded set of domain terms extracted from the report
//!
//! Searches go through a TTL-expiring on-disk cache and a bounded
//! exponential-backoff retry wrapper; every create/update purges the
//! repository's cache entries and appends a line to the prevention-metrics
//! log.
//!
//! ## Quick start
//!
//! ```no_run
//! use dupgate::config::Config;
//! use dupgate::gh::GhTracker;
//! use dupgate::report::{Reporter, ReportRequest};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let tracker = GhTracker::new();
//! let reporter = Reporter::new(&config, &tracker);
//!
//! let number = reporter.create_or_update(&ReportRequest {
//!     repository: "acme/app",
//!     title: "Security Scan - Commit abc123d",
//!     body: "## Findings\n...",
//!     labels: "automated,security",
//!     identifier: Some("abc123d"),
//! })?;
//! println!("issue #{number}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gh;
pub mod keywords;
pub mod matcher;
pub mod metrics;
pub mod report;
pub mod retry;

pub use config::Config;
pub use error::Error;
pub use gh::{GhTracker, Tracker};
pub use report::{ReportRequest, Reporter};
