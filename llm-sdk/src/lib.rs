//! # LLM SDK
//!
//! Client plumbing for the upstream LLM provider used by the prompt service.
//!
//! This crate provides:
//!
//! - A typed client for the Responses API (`POST /responses`, `GET /responses/{id}`)
//!   behind the `ResponsesApi` trait so callers can substitute a scripted double
//! - A `ServiceError` taxonomy with HTTP status mapping
//! - Resilience primitives: a timeout-bounded invoker, a retrying invoker that
//!   widens the deadline on every retry, and a completion poller for responses
//!   that come back `queued` or `in_progress`
//! - Provider configuration (OpenAI or OpenRouter) loaded through `config-rs`

// Re-export service-specific modules
pub mod services;
pub use services::openai::{
    ResponseRequest, ResponseStatus, ResponsesApi, ResponsesClient, ResponsesClientBuilder,
    TokenUsage, ToolSpec,
};

// Re-export error handling
pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{
    with_timeout, CompletionPoller, PollConfig, Resilience, RetryConfig, RetryExecutor,
};

// Re-export configuration management
pub mod config;
pub use config::{OpenAIConfig, Provider, ServiceConfig};

pub mod util;

#[cfg(test)]
mod tests;
