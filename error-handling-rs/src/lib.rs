//! # Error Handling Support
//!
//! Ambient concerns shared by every crate in the prompt service workspace:
//!
//! - Structured logging initialisation on top of `tracing-subscriber`
//! - Redaction of credential-shaped substrings before text leaves the process
//!

pub mod logging;
pub mod sanitization;

// Re-export commonly used types
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use sanitization::{is_sensitive_key, redact_secrets, redact_with_known};
