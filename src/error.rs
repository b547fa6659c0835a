//! Crate-level error taxonomy.
//!
//! Two terminal categories drive the §7 propagation policy and the CLI's
//! exit-code mapping:
//!
//! * [`Error::Validation`] — the request was rejected before any remote call.
//! * [`Error::RemoteExhausted`] — a retried remote operation gave up, carrying
//!   the operation name, the attempt count, and the last underlying error.

use std::fmt;

/// Terminal errors surfaced at the crate seam.
#[derive(Debug)]
pub enum Error {
    /// A request failed local validation (empty title, malformed repository).
    Validation(String),
    /// A remote operation failed after exhausting its retry budget.
    RemoteExhausted {
        /// Human-readable name of the operation that was retried.
        operation: String,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The last error observed.
        source: anyhow::Error,
    },
}

impl Error {
    /// Construct a [`Error::Validation`] from anything string-like.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(message) => write!(f, "{message}"),
            Error::RemoteExhausted {
                operation,
                attempts,
                source,
            } => write!(
                f,
                "{operation} failed after {attempts} attempts: {source}"
            ),
        }
    }
}

impl std::error::Error for Error {}
