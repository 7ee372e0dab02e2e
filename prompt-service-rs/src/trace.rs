//! Per-request attempt trace and empty-output diagnosis

use serde::Serialize;
use serde_json::Value;

use llm_sdk::services::openai::{incomplete_reason, response_id};
use llm_sdk::{ResponseStatus, TokenUsage};

use crate::extract::{has_web_search_call, output_item_types};

/// Incomplete reason reported when the output token cap was hit
pub const TOKEN_LIMIT_REASON: &str = "max_output_tokens";

/// Escalation steps, in the order they may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStep {
    InitialWebSearch,
    RetryWebSearchDirectText,
    FinalizeFromPreviousWebSearch,
    RetryModelOnly,
    FinalizeFromPreviousModelOnly,
}

impl AttemptStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStep::InitialWebSearch => "initial_web_search",
            AttemptStep::RetryWebSearchDirectText => "retry_web_search_direct_text",
            AttemptStep::FinalizeFromPreviousWebSearch => "finalize_from_previous_web_search",
            AttemptStep::RetryModelOnly => "retry_model_only",
            AttemptStep::FinalizeFromPreviousModelOnly => "finalize_from_previous_model_only",
        }
    }

    /// Whether the web search tool is offered on this step
    pub fn uses_web_search(&self) -> bool {
        matches!(
            self,
            AttemptStep::InitialWebSearch
                | AttemptStep::RetryWebSearchDirectText
                | AttemptStep::FinalizeFromPreviousWebSearch
        )
    }

    /// Whether this step continues the previous response
    pub fn is_continuation(&self) -> bool {
        matches!(
            self,
            AttemptStep::FinalizeFromPreviousWebSearch | AttemptStep::FinalizeFromPreviousModelOnly
        )
    }
}

/// Metadata of one upstream call, recorded once it has settled
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamAttempt {
    pub step: AttemptStep,
    pub elapsed_ms: u64,
    pub response_id: Option<String>,
    pub status: Option<String>,
    pub incomplete_reason: Option<String>,
    pub output_types: Vec<String>,
    pub output_count: usize,
    pub has_output_text: bool,
    pub has_refusal: bool,
    pub has_web_search_call: bool,
    pub output_text_length: usize,
    pub refusal_length: usize,
    pub usage: Option<TokenUsage>,
    pub max_output_tokens: u32,
}

impl UpstreamAttempt {
    /// Record a settled response together with what was extracted from it
    pub fn record(
        step: AttemptStep,
        elapsed_ms: u64,
        max_output_tokens: u32,
        response: &Value,
        text: &str,
        refusal: &str,
    ) -> Self {
        let output_types = output_item_types(response);

        Self {
            step,
            elapsed_ms,
            response_id: response_id(response),
            status: ResponseStatus::from_response(response).map(|s| s.as_str().to_string()),
            incomplete_reason: incomplete_reason(response),
            output_count: output_types.len(),
            output_types,
            has_output_text: !text.is_empty(),
            has_refusal: !refusal.is_empty(),
            has_web_search_call: has_web_search_call(response),
            output_text_length: text.chars().count(),
            refusal_length: refusal.chars().count(),
            usage: TokenUsage::from_response(response),
            max_output_tokens,
        }
    }

    /// Whether the response stopped because the output token cap was reached
    pub fn hit_token_limit(&self) -> bool {
        self.incomplete_reason.as_deref() == Some(TOKEN_LIMIT_REASON)
    }

    /// Neither text nor refusal came back
    pub fn is_empty(&self) -> bool {
        !self.has_output_text && !self.has_refusal
    }
}

/// Best guess at why the first attempt produced no text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    MissingFirstAttemptTrace,
    NoEmptyOutputFirstAttempt,
    FirstAttemptRefusal,
    MaxOutputTokensReached,
    FirstAttemptNotCompleted,
    WebSearchWithoutFinalText,
    FirstAttemptNoOutputItems,
    FirstAttemptNonTextOutput,
}

impl RootCause {
    fn summary(&self) -> &'static str {
        match self {
            RootCause::MissingFirstAttemptTrace => "No upstream attempt was recorded.",
            RootCause::NoEmptyOutputFirstAttempt => "The first attempt returned text.",
            RootCause::FirstAttemptRefusal => "The model refused on the first attempt.",
            RootCause::MaxOutputTokensReached => {
                "The first attempt ran out of output tokens before emitting the final text."
            }
            RootCause::FirstAttemptNotCompleted => "The first attempt did not reach the completed status.",
            RootCause::WebSearchWithoutFinalText => {
                "The first attempt ran a web search but never wrote the final text."
            }
            RootCause::FirstAttemptNoOutputItems => "The first attempt returned no output items.",
            RootCause::FirstAttemptNonTextOutput => "The first attempt returned only non-text output items.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub root_cause: RootCause,
    pub summary: String,
}

/// Classify the first attempt of a trace; later attempts are ignored
pub fn build_diagnosis(trace: &[UpstreamAttempt]) -> Diagnosis {
    let root_cause = match trace.first() {
        None => RootCause::MissingFirstAttemptTrace,
        Some(first) if first.has_output_text => RootCause::NoEmptyOutputFirstAttempt,
        Some(first) if first.has_refusal => RootCause::FirstAttemptRefusal,
        Some(first) if first.hit_token_limit() => RootCause::MaxOutputTokensReached,
        Some(first) if first.status.as_deref().is_some_and(|s| s != "completed") => {
            RootCause::FirstAttemptNotCompleted
        }
        Some(first) if first.has_web_search_call => RootCause::WebSearchWithoutFinalText,
        Some(first) if first.output_count == 0 => RootCause::FirstAttemptNoOutputItems,
        Some(_) => RootCause::FirstAttemptNonTextOutput,
    };

    Diagnosis {
        root_cause,
        summary: root_cause.summary().to_string(),
    }
}

/// Error summary carried in the debug payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugError {
    pub kind: String,
    pub status: Option<u16>,
    pub message: String,
}

/// Request-scoped diagnostics returned with every `/api/improve` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugPayload {
    pub request_id: String,
    pub model: String,
    pub trace: Vec<UpstreamAttempt>,
    pub diagnosis: Diagnosis,
    pub first_attempt: Option<UpstreamAttempt>,
    pub final_attempt: Option<UpstreamAttempt>,
    pub recovered_from_empty_output: bool,
    pub used_no_web_recovery: bool,
    pub used_local_fallback: bool,
    pub total_elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DebugError>,
}

impl DebugPayload {
    pub fn new(request_id: &str, model: &str, trace: Vec<UpstreamAttempt>, total_elapsed_ms: u64) -> Self {
        Self {
            request_id: request_id.to_string(),
            model: model.to_string(),
            diagnosis: build_diagnosis(&trace),
            first_attempt: trace.first().cloned(),
            final_attempt: trace.last().cloned(),
            trace,
            recovered_from_empty_output: false,
            used_no_web_recovery: false,
            used_local_fallback: false,
            total_elapsed_ms,
            error: None,
        }
    }
}
