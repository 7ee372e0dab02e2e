//! # Structured Logging
//!
//! Installs the process-wide `tracing` subscriber. Output is either JSON lines
//! (one object per event) or human readable text.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Errors raised while installing the subscriber
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to set global subscriber: {0}")]
    Subscriber(String),
}

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "unknown-service".to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Build a config for `service_name` from `LOG_LEVEL` and `LOG_JSON`.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let level = env::var("LOG_LEVEL")
            .ok()
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let json_format = env::var("LOG_JSON")
            .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Self {
            level,
            service_name: service_name.into(),
            json_format,
        }
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("{},hyper=warn,reqwest=warn", self.level)
    }
}

/// Returns whether a global subscriber has been installed by this crate
pub fn is_initialized() -> bool {
    LOGGING_INITIALIZED.load(Ordering::SeqCst)
}

/// Initializes the structured logging system
pub fn init_logging(config: Option<LoggingConfig>) -> Result<(), LoggingError> {
    // Don't re-initialize if already done
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let registry = Registry::default().with(filter);

    // JSON and text layers have distinct types, so each branch installs its own subscriber.
    // `try_init` also bridges `log` records from crates that use the `log` facade.
    let installed = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true);
        registry.with(json_layer).try_init()
    } else {
        let text_layer = fmt::layer().with_target(true);
        registry.with(text_layer).try_init()
    };

    if let Err(e) = installed {
        LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(LoggingError::Subscriber(e.to_string()));
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}
