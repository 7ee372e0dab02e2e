//! Error mapping for upstream HTTP failures
//!
//! Converts the status code and body of a failed upstream response into a
//! normalized `ServiceError`. The status is always preserved in the context.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Longest raw body echoed into an error message
const MAX_BODY_EXCERPT: usize = 200;

/// Map an OpenAI-style error body (`{"error": {"message", "type", "code"}}`)
pub fn map_openai_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    let error = json.get("error");

    if let Some(error_type) = error.and_then(|e| e.get("type")).and_then(|t| t.as_str()) {
        context.add("error_type", error_type);
    }

    // OpenAI sends string codes, OpenRouter sends numeric ones
    if let Some(code) = error.and_then(|e| e.get("code")) {
        match code {
            Value::String(code) => context.error_code = Some(code.clone()),
            Value::Number(code) => context.error_code = Some(code.to_string()),
            _ => {}
        }
    }

    let message = error
        .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
        .or_else(|| json.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Upstream returned {}", status));

    error_for_status(status, message)
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    // Try to parse as JSON first
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if json.is_object() {
            return map_openai_error(status, &json, context);
        }
    }

    // Fallback to status-based mapping
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, crate::util::truncate_string(body.trim(), MAX_BODY_EXCERPT))
    };

    error_for_status(status, message)
}

/// Pick the error variant for an HTTP status
pub fn error_for_status(status: StatusCode, message: String) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::validation(message)
        }
        _ => ServiceError::service(message),
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 422 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}
