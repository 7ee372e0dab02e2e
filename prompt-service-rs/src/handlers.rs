//! HTTP handlers for `/api/improve` and `/health`

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use error_handling_rs::redact_with_known;
use llm_sdk::util::elapsed_ms;
use llm_sdk::{ServiceConfig, ServiceError};

use crate::fallback::build_local_fallback_prompt;
use crate::pipeline::PipelineOutcome;
use crate::trace::{DebugError, DebugPayload};
use crate::validation::{parse_improve_request, validate_prompt, ApiValidationError};
use crate::ImproveService;

/// Response header carrying the per-request debug id
pub const DEBUG_REQUEST_ID_HEADER: &str = "x-debug-request-id";

/// `usedModel` reported when the prompt was built locally
pub const LOCAL_FALLBACK_MODEL: &str = "local-fallback";

const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed. Use POST /api/improve.";

/// Id assigned to each `/api/improve` request
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Successful `/api/improve` body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveResponse {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_from_empty_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_no_web_recovery: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_local_fallback: Option<bool>,
    pub used_web_search: bool,
    pub used_model: String,
    pub request_id: String,
    pub debug: DebugPayload,
}

/// Error body shared by every non-200 `/api/improve` response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugPayload>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// What the handler does with an error that aborted the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamDisposition {
    /// Missing or unusable credential
    Misconfigured,
    /// Answer 200 with a locally generated prompt
    LocalFallback,
    /// Forward the upstream client error status
    Passthrough(StatusCode),
    BadGateway,
    GatewayTimeout,
}

/// Map an upstream failure to the handler's response strategy
pub fn classify_upstream_error(err: &ServiceError, has_prompt: bool) -> UpstreamDisposition {
    if err.is_configuration() {
        return UpstreamDisposition::Misconfigured;
    }

    if err.is_timeout() {
        return if has_prompt {
            UpstreamDisposition::LocalFallback
        } else {
            UpstreamDisposition::GatewayTimeout
        };
    }

    let status = err.status_code();
    let transient = status.is_some_and(|s| s >= 500)
        || matches!(err.root(), ServiceError::Network(_) | ServiceError::Parsing(_));

    if transient {
        return if has_prompt {
            UpstreamDisposition::LocalFallback
        } else {
            UpstreamDisposition::BadGateway
        };
    }

    match status.and_then(|s| StatusCode::from_u16(s).ok()) {
        Some(code) if code.is_client_error() => UpstreamDisposition::Passthrough(code),
        _ => UpstreamDisposition::BadGateway,
    }
}

/// Assign a request id and echo it in the response headers
pub async fn attach_request_id(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(DEBUG_REQUEST_ID_HEADER, value);
    }
    response
}

/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}

/// Any method other than POST on `/api/improve`
pub async fn method_not_allowed() -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: METHOD_NOT_ALLOWED_MESSAGE.to_string(),
            request_id: None,
            debug: None,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST"));
    response
}

/// POST /api/improve
pub async fn improve_handler(
    State(service): State<Arc<ImproveService>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let span = tracing::info_span!("improve", request_id = %request_id);
    improve(&service, &request_id, body).instrument(span).await
}

async fn improve(service: &ImproveService, request_id: &str, body: Result<Bytes, BytesRejection>) -> Response {
    let started = Instant::now();
    let config = service.config();

    let known_secrets = [config.provider.api_key.as_str()];
    let untraced = || Some(DebugPayload::new(request_id, &config.model, Vec::new(), elapsed_ms(started)));

    if let Err(err) = config.provider.validate() {
        tracing::error!(error = %err, "Provider is not configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), request_id, untraced());
    }

    let prompt = match read_prompt(body, config.max_prompt_chars) {
        Ok(prompt) => prompt,
        Err(err) => {
            tracing::info!(error = %err, "Rejected improve request");
            return error_response(err.status(), err.to_string(), request_id, untraced());
        }
    };

    tracing::info!(prompt_chars = prompt.chars().count(), "Improving prompt");
    let run = service.pipeline().run(&prompt).await;
    let mut debug = DebugPayload::new(request_id, &config.model, run.trace, elapsed_ms(started));

    let response = match run.outcome {
        PipelineOutcome::Text {
            output,
            recovered_from_empty,
            used_no_web_recovery,
            used_web_search,
            ..
        } => {
            debug.recovered_from_empty_output = recovered_from_empty;
            debug.used_no_web_recovery = used_no_web_recovery;
            (
                StatusCode::OK,
                Json(ImproveResponse {
                    prompt: output,
                    recovered_from_empty_output: Some(recovered_from_empty),
                    used_no_web_recovery: Some(used_no_web_recovery),
                    used_local_fallback: None,
                    used_web_search,
                    used_model: config.model.clone(),
                    request_id: request_id.to_string(),
                    debug: debug.clone(),
                }),
            )
                .into_response()
        }
        PipelineOutcome::Refusal(refusal) => {
            tracing::info!(refusal_chars = refusal.chars().count(), "Model refused the request");
            let refusal = redact_with_known(&refusal, &known_secrets);
            error_response(StatusCode::UNPROCESSABLE_ENTITY, refusal, request_id, Some(debug.clone()))
        }
        PipelineOutcome::LocalFallback => local_fallback_response(&prompt, request_id, &mut debug),
        PipelineOutcome::UpstreamError(err) => {
            let message = redact_with_known(&err.to_string(), &known_secrets);
            debug.error = Some(DebugError {
                kind: err.kind().to_string(),
                status: err.status_code(),
                message: message.clone(),
            });

            match classify_upstream_error(&err, !prompt.is_empty()) {
                UpstreamDisposition::LocalFallback => {
                    tracing::warn!(error = %message, "Upstream failed, answering with the local fallback");
                    local_fallback_response(&prompt, request_id, &mut debug)
                }
                UpstreamDisposition::Misconfigured => {
                    tracing::error!(error = %message, "Provider rejected the local configuration");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, message, request_id, Some(debug.clone()))
                }
                UpstreamDisposition::Passthrough(status) => {
                    tracing::warn!(status = status.as_u16(), error = %message, "Upstream rejected the request");
                    error_response(status, message, request_id, Some(debug.clone()))
                }
                UpstreamDisposition::GatewayTimeout => {
                    error_response(StatusCode::GATEWAY_TIMEOUT, message, request_id, Some(debug.clone()))
                }
                UpstreamDisposition::BadGateway => {
                    tracing::error!(error = %message, "Unexpected upstream failure");
                    error_response(StatusCode::BAD_GATEWAY, message, request_id, Some(debug.clone()))
                }
            }
        }
    };

    if config.debug_trace_log {
        match serde_json::to_string(&debug) {
            Ok(json) => tracing::info!(debug = %json, "Improve request trace"),
            Err(e) => tracing::warn!("Failed to serialize debug payload: {}", e),
        }
    }

    response
}

fn read_prompt(body: Result<Bytes, BytesRejection>, max_chars: usize) -> Result<String, ApiValidationError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiValidationError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiValidationError::InvalidFormat(rejection.body_text())
        }
    })?;

    let request = parse_improve_request(&body)?;
    validate_prompt(&request, max_chars)
}

fn local_fallback_response(prompt: &str, request_id: &str, debug: &mut DebugPayload) -> Response {
    debug.used_local_fallback = true;

    (
        StatusCode::OK,
        Json(ImproveResponse {
            prompt: build_local_fallback_prompt(prompt),
            recovered_from_empty_output: None,
            used_no_web_recovery: None,
            used_local_fallback: Some(true),
            used_web_search: false,
            used_model: LOCAL_FALLBACK_MODEL.to_string(),
            request_id: request_id.to_string(),
            debug: debug.clone(),
        }),
    )
        .into_response()
}

fn error_response(status: StatusCode, error: String, request_id: &str, debug: Option<DebugPayload>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            request_id: Some(request_id.to_string()),
            debug,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_sdk::ErrorContext;

    fn with_status(err: ServiceError, status: u16) -> ServiceError {
        err.with_context(ErrorContext::for_service("openai").status_code(status))
    }

    #[test]
    fn test_timeouts_fall_back_only_with_a_prompt() {
        let err = ServiceError::timeout("initial_web_search", std::time::Duration::from_secs(30)).with_attempts(3);
        assert_eq!(classify_upstream_error(&err, true), UpstreamDisposition::LocalFallback);
        assert_eq!(classify_upstream_error(&err, false), UpstreamDisposition::GatewayTimeout);
    }

    #[test]
    fn test_server_errors_are_masked() {
        let err = with_status(ServiceError::service("overloaded"), 503);
        assert_eq!(classify_upstream_error(&err, true), UpstreamDisposition::LocalFallback);
        assert_eq!(
            classify_upstream_error(&ServiceError::network("connection reset"), true),
            UpstreamDisposition::LocalFallback
        );
        assert_eq!(
            classify_upstream_error(&ServiceError::parsing("not json"), true),
            UpstreamDisposition::LocalFallback
        );
    }

    #[test]
    fn test_client_errors_pass_through() {
        let err = with_status(ServiceError::authentication("bad key"), 401);
        assert_eq!(
            classify_upstream_error(&err, true),
            UpstreamDisposition::Passthrough(StatusCode::UNAUTHORIZED)
        );

        let err = with_status(ServiceError::rate_limit("slow down"), 429);
        assert_eq!(
            classify_upstream_error(&err, true),
            UpstreamDisposition::Passthrough(StatusCode::TOO_MANY_REQUESTS)
        );
    }

    #[test]
    fn test_configuration_and_unknown_errors() {
        assert_eq!(
            classify_upstream_error(&ServiceError::configuration("no key"), true),
            UpstreamDisposition::Misconfigured
        );
        assert_eq!(
            classify_upstream_error(&ServiceError::internal("boom"), true),
            UpstreamDisposition::BadGateway
        );
    }

    #[test]
    fn test_fallback_body_shape() {
        let mut debug = DebugPayload::new("req-1", "gpt-4.1-mini", Vec::new(), 0);
        let response = local_fallback_response("Ho bisogno di una dieta", "req-1", &mut debug);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(debug.used_local_fallback);
    }
}
