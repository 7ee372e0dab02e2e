//! Common utilities for service clients
//!
//! This module provides shared HTTP plumbing for the upstream clients.

use std::fmt;
use std::time::Duration;

use error_handling_rs::redact_secrets;
use reqwest::{header, Client};

use crate::error::mapping::{classify_http_error, map_http_error};
use crate::error::{ErrorContext, Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "prompt-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("llm-sdk".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    let mut builder = reqwest::Client::builder().default_headers(headers).gzip(true);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Create error context for HTTP requests
pub fn create_error_context(service_name: &str, endpoint: &str, status: reqwest::StatusCode) -> ErrorContext {
    ErrorContext::for_service(service_name)
        .endpoint(endpoint)
        .status_code(status.as_u16())
}

/// Parse error response from HTTP response
pub async fn parse_error_response(service_name: &str, endpoint: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let mut context = create_error_context(service_name, endpoint, status);

    if let Some(request_id) = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
    {
        context = context.request_id(request_id);
    }

    // Try to get the response body
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    tracing::debug!(
        service = %service_name,
        endpoint = %endpoint,
        status = status.as_u16(),
        category = classify_http_error(status),
        body = %redact_secrets(&crate::util::truncate_string(&body, 200)),
        "Upstream returned an error status"
    );

    // Map to appropriate error type based on status
    let error = map_http_error(status, &body, &mut context);
    error.with_context(context)
}
