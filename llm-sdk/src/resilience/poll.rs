//! Completion polling for responses that come back pending
//!
//! A response whose status is `queued` or `in_progress` is re-fetched by id at
//! a fixed interval until it settles or the total wait budget runs out.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use super::timeout::with_timeout;
use crate::error::{Result, ServiceError};
use crate::services::openai::{response_id, ResponseStatus};

/// Polling configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between re-fetches
    pub interval: Duration,

    /// Total sleep budget before giving up
    pub max_wait: Duration,

    /// Deadline for each individual re-fetch
    pub fetch_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1_200),
            max_wait: Duration::from_millis(45_000),
            fetch_timeout: Duration::from_millis(30_000),
        }
    }
}

/// Re-fetches pending responses until they reach a terminal status
#[derive(Debug, Clone, Default)]
pub struct CompletionPoller {
    config: PollConfig,
}

impl CompletionPoller {
    /// Create a poller with the specified configuration
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Get the polling configuration
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Wait for `initial` to settle.
    ///
    /// Non-pending responses are returned immediately, as are pending ones that
    /// carry no id. Raises a timeout labelled `polling` once the accumulated
    /// wait reaches `max_wait` while the response is still pending.
    pub async fn settle<F, Fut>(&self, initial: Value, mut fetch: F) -> Result<Value>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let mut current = initial;
        let mut waited = Duration::ZERO;

        loop {
            if !ResponseStatus::from_response(&current).is_some_and(|status| status.is_pending()) {
                return Ok(current);
            }

            let Some(id) = response_id(&current) else {
                tracing::debug!("Pending response has no id, returning it unpolled");
                return Ok(current);
            };

            if waited >= self.config.max_wait {
                tracing::warn!(
                    response_id = %id,
                    waited_ms = waited.as_millis() as u64,
                    "Response still pending after the polling budget"
                );
                return Err(ServiceError::timeout("polling", self.config.max_wait));
            }

            tokio::time::sleep(self.config.interval).await;
            waited += self.config.interval;

            tracing::debug!(response_id = %id, waited_ms = waited.as_millis() as u64, "Polling pending response");
            let label = format!("poll {}", id);
            current = with_timeout(&label, self.config.fetch_timeout, fetch(id)).await?;
        }
    }
}
