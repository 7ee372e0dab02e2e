//! Request validation for `/api/improve`
//!
//! The body is parsed by hand from raw bytes so that malformed JSON produces
//! the service's own 400 body instead of the framework's rejection.

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tower_http::limit::RequestBodyLimitLayer;

/// Maximum request payload size (64 KiB)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

// Three or more consecutive newlines
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Body of `POST /api/improve`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveRequest {
    #[serde(default)]
    pub prompt: Option<String>,

    /// Accepted for compatibility; web search is always attempted first
    #[serde(default)]
    pub use_web_search: Option<bool>,
}

/// Validation error for API requests
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Invalid request format: {0}")]
    InvalidFormat(String),

    #[error("Request payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Prompt is required")]
    MissingPrompt,

    #[error("Prompt is too long ({length} characters, maximum {max})")]
    PromptTooLong { length: usize, max: usize },
}

impl ApiValidationError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidFormat(_) | Self::MissingPrompt | Self::PromptTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

/// Request body size limit layer
pub fn payload_limit_config() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}

/// Unify line endings, collapse runs of blank lines and trim.
///
/// Applying it twice yields the same string as applying it once.
pub fn normalize_prompt(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    BLANK_RUN.replace_all(&unified, "\n\n").trim().to_string()
}

/// Parse the raw request body
pub fn parse_improve_request(body: &[u8]) -> Result<ImproveRequest, ApiValidationError> {
    if body.len() > MAX_PAYLOAD_SIZE {
        return Err(ApiValidationError::PayloadTooLarge(format!(
            "Payload size ({} bytes) exceeds maximum allowed size ({} bytes)",
            body.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ImproveRequest::default());
    }

    serde_json::from_slice::<ImproveRequest>(body)
        .map_err(|e| ApiValidationError::InvalidFormat(format!("Invalid JSON: {}", e)))
}

/// Normalize and check the prompt, returning the text to send upstream
pub fn validate_prompt(request: &ImproveRequest, max_chars: usize) -> Result<String, ApiValidationError> {
    let prompt = normalize_prompt(request.prompt.as_deref().unwrap_or_default());

    if prompt.is_empty() {
        return Err(ApiValidationError::MissingPrompt);
    }

    let length = prompt.chars().count();
    if length > max_chars {
        return Err(ApiValidationError::PromptTooLong {
            length,
            max: max_chars,
        });
    }

    Ok(prompt)
}
