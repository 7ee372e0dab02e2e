//! Resilience patterns for upstream calls
//!
//! This module provides the primitives the prompt service wraps around every
//! Responses API call:
//! - Timeout-bounded invocation
//! - Retry on timeout with a widening deadline
//! - Polling of pending responses until they settle
//! - Unified resilience facade

mod poll;
mod retry;
mod timeout;

pub use poll::{CompletionPoller, PollConfig};
pub use retry::{RetryConfig, RetryExecutor};
pub use timeout::with_timeout;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;

/// A unified resilience facade that composes the retry executor and the poller
#[derive(Debug, Clone, Default)]
pub struct Resilience {
    /// Retry executor
    retry: RetryExecutor,

    /// Completion poller
    poller: CompletionPoller,
}

impl Resilience {
    /// Create a new resilience facade with specified configurations
    pub fn new(retry_config: RetryConfig, poll_config: PollConfig) -> Self {
        Self {
            retry: RetryExecutor::new(retry_config),
            poller: CompletionPoller::new(poll_config),
        }
    }

    /// Run `operation` under a deadline, retrying on timeout with a longer one
    pub async fn call<F, Fut, T>(&self, label: &str, initial_timeout: Duration, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry.execute(label, initial_timeout, operation).await
    }

    /// Poll a possibly pending response until it reaches a terminal status
    pub async fn settle<F, Fut>(&self, initial: Value, fetch: F) -> Result<Value>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.poller.settle(initial, fetch).await
    }

    /// Get the retry configuration
    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    /// Get the polling configuration
    pub fn poll_config(&self) -> &PollConfig {
        self.poller.config()
    }
}
