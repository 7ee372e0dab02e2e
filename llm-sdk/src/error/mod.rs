//! Error handling for the LLM SDK
//!
//! This module provides the error system shared by the client and the
//! resilience primitives:
//! - Categorizes errors by type (network, auth, rate limit, timeout, etc.)
//! - Adds context (HTTP status, upstream error code, endpoint) to errors
//! - Maps upstream HTTP error bodies to normalized errors

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use config_rs::ConfigError;
use error_handling_rs::is_sensitive_key;
use error_handling_rs::sanitization::REDACTED;
use thiserror::Error;

pub mod mapping;

/// Result type for LLM SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the LLM SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors (permission issues)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Upstream service errors
    #[error("Service error: {0}")]
    Service(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A deadline expired before the operation finished
    #[error("Timeout error: {label} exceeded {timeout_ms} ms (attempts: {attempts})")]
    Timeout {
        label: String,
        timeout_ms: u64,
        attempts: u32,
    },

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    /// Create an upstream service error
    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a timeout error for a single attempt
    pub fn timeout(label: impl Into<String>, deadline: Duration) -> Self {
        ServiceError::Timeout {
            label: label.into(),
            timeout_ms: deadline.as_millis() as u64,
            attempts: 1,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let mut context = ErrorContext::new();
        context.add(key, value);
        self.with_context(context)
    }

    /// Record the total number of attempts on a timeout error.
    ///
    /// Other variants are returned unchanged.
    pub fn with_attempts(self, attempts: u32) -> Self {
        match self {
            ServiceError::Timeout {
                label, timeout_ms, ..
            } => ServiceError::Timeout {
                label,
                timeout_ms,
                attempts,
            },
            ServiceError::WithContext { inner, context } => ServiceError::WithContext {
                inner: Box::new(inner.with_attempts(attempts)),
                context,
            },
            other => other,
        }
    }

    /// The underlying error with every context wrapper removed
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Short machine-readable category name
    pub fn kind(&self) -> &'static str {
        match self.root() {
            ServiceError::Network(_) => "network",
            ServiceError::Authentication(_) => "authentication",
            ServiceError::Authorization(_) => "authorization",
            ServiceError::RateLimit(_) => "rate_limit",
            ServiceError::Service(_) => "service",
            ServiceError::Validation(_) => "validation",
            ServiceError::Parsing(_) => "parsing",
            ServiceError::Configuration(_) => "configuration",
            ServiceError::Timeout { .. } => "timeout",
            ServiceError::Internal(_) => "internal",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::WithContext { .. } => "unknown",
        }
    }

    /// Get the upstream error code if available
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.error_code.as_deref().or_else(|| inner.error_code())
            }
            _ => None,
        }
    }

    /// Get the service name if available
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { context, .. } => Some(&context.service),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Check if this is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), ServiceError::Timeout { .. })
    }

    /// Number of attempts recorded on a timeout error
    pub fn attempts(&self) -> Option<u32> {
        match self.root() {
            ServiceError::Timeout { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Check if the configured credential is missing or unusable locally
    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), ServiceError::Configuration(_))
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// When the error was observed
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Upstream error code (e.g. `invalid_api_key`)
    pub error_code: Option<String>,

    /// Upstream request ID, when the provider returns one
    pub request_id: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            error_code: None,
            request_id: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add an error code
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add an upstream request ID
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value. Values under sensitive keys are stored redacted.
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        let key = key.into();
        let value = if is_sensitive_key(&key) {
            REDACTED.to_string()
        } else {
            value.to_string()
        };
        self.data.insert(key, value);
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::for_service("http_client");

        let service_error = if err.is_timeout() {
            ServiceError::Timeout {
                label: "http client".to_string(),
                timeout_ms: 0,
                attempts: 1,
            }
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_request() {
            ServiceError::network(format!("Request failed: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else {
            ServiceError::internal(format!("HTTP client error: {}", err))
        };

        // Add status code if available
        if let Some(status) = err.status() {
            service_error.with_context(context.status_code(status.as_u16()))
        } else {
            service_error.with_context(context)
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
            .with_context(ErrorContext::for_service("json"))
    }
}

/// Convert configuration lookup errors to ServiceError
impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        ServiceError::configuration(err.to_string())
    }
}
