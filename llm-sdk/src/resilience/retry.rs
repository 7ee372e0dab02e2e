//! Retry on timeout with a widening deadline
//!
//! Only deadline expiries are retried. Slow upstream responses (web search in
//! particular) often succeed with more time, while authentication, validation
//! and quota failures never do, so those propagate on the first occurrence.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::timeout::with_timeout;
use crate::error::Result;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_retries: u32,

    /// Deadline increment added on every retry
    pub timeout_step: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout_step: Duration::from_millis(15_000),
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_retries: {}, timeout_step: {:?} }}",
            self.max_retries, self.timeout_step
        )
    }
}

/// Executor for timeout-bounded operations with retry on timeout
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    /// Retry configuration
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Deadline and label used for attempt `attempt` (0-based)
    pub fn attempt_plan(&self, label: &str, initial_timeout: Duration, attempt: u32) -> (String, Duration) {
        let deadline = initial_timeout.saturating_add(self.config.timeout_step.saturating_mul(attempt));
        let attempt_label = if attempt == 0 {
            label.to_string()
        } else {
            format!("{} retry-{}", label, attempt)
        };
        (attempt_label, deadline)
    }

    /// Execute `operation`, retrying on timeout.
    ///
    /// Attempt `k` runs under `initial_timeout + k * timeout_step`. When every
    /// attempt times out the last timeout is returned with `attempts` set to
    /// `max_retries + 1`.
    pub async fn execute<F, Fut, T>(&self, label: &str, initial_timeout: Duration, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            let (attempt_label, deadline) = self.attempt_plan(label, initial_timeout, attempt);

            match with_timeout(&attempt_label, deadline, operation()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_timeout() && attempt < self.config.max_retries => {
                    tracing::warn!(
                        label = %attempt_label,
                        timeout_ms = deadline.as_millis() as u64,
                        attempt = attempt + 1,
                        max_attempts,
                        "Upstream call timed out, retrying with a longer deadline"
                    );
                    attempt += 1;
                }
                Err(err) if err.is_timeout() => {
                    tracing::warn!(label = %label, attempts = max_attempts, "Upstream call timed out on every attempt");
                    return Err(err.with_attempts(max_attempts));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
