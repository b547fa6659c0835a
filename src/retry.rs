//! Bounded exponential backoff around remote calls.
//!
//! Wraps any fallible operation: up to `max_retries` attempts, delay
//! doubling from `retry_base_delay` up to `retry_max_delay`. Errors that
//! cannot succeed on retry (bad credentials, missing repository) fail fast;
//! everything else is treated as transient. The last error is preserved in
//! [`Error::RemoteExhausted`] together with the attempt count.

use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryExecutor {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            // Zero would mean never calling the operation at all
            max_retries: max_retries.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_retries,
            config.retry_base_delay,
            config.retry_max_delay,
        )
    }

    /// Run `op` until it succeeds or attempts are exhausted. `operation`
    /// names the call in logs and in the terminal error.
    pub fn execute<T>(&self, operation: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= self.max_retries || is_fatal(&err) {
                return Err(Error::RemoteExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: err,
                }
                .into());
            }

            let delay = self.backoff_delay(attempt);
            tracing::warn!(
                "{} failed (attempt {}/{}), retrying in {:?}: {}",
                operation,
                attempt,
                self.max_retries,
                delay,
                err
            );
            std::thread::sleep(delay);
        }
    }

    /// Delay before retry number `attempt + 1`: base × 2^(attempt-1), capped.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay)
    }
}

/// Errors no amount of retrying will fix. Rate limiting and 5xx responses
/// are deliberately not here; those are the transient cases backoff exists
/// for.
fn is_fatal(error: &anyhow::Error) -> bool {
    let message = error.to_string().to_lowercase();
    ["bad credentials", "authentication", "not found", "could not resolve"]
        .iter()
        .any(|marker| message.contains(marker))
}
