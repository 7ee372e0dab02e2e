//! Responses API data models
//!
//! Requests are strongly typed. Responses are kept as raw `serde_json::Value`
//! because their shape drifts between providers and tool configurations; the
//! helpers here read the few fields every caller needs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the model may call while producing a response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSpec {
    /// Tool type, e.g. `web_search`
    #[serde(rename = "type")]
    pub kind: String,
}

impl ToolSpec {
    /// Create a tool entry of the given type
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Request body for `POST /responses`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResponseRequest {
    /// ID of the model to use
    pub model: String,

    /// System-level instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// User input
    pub input: String,

    /// Upper bound on generated tokens, reasoning included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Tools the model may call; omitted when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    /// Continue from an earlier response's context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

impl ResponseRequest {
    /// Create a request for `model` with the given input
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            ..Self::default()
        }
    }

    /// Set the instructions
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the output token cap
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Enable a tool
    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    /// Reference an earlier response
    pub fn previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    /// Whether any tool is enabled
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// Lifecycle status of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    Completed,
    Incomplete,
    Queued,
    InProgress,
    /// Any status this client does not model (`failed`, `cancelled`, ...)
    Other(String),
}

impl ResponseStatus {
    /// Parse a status string
    pub fn parse(status: &str) -> Self {
        match status {
            "completed" => ResponseStatus::Completed,
            "incomplete" => ResponseStatus::Incomplete,
            "queued" => ResponseStatus::Queued,
            "in_progress" => ResponseStatus::InProgress,
            other => ResponseStatus::Other(other.to_string()),
        }
    }

    /// Read the `status` field of a raw response
    pub fn from_response(response: &Value) -> Option<Self> {
        response
            .get("status")
            .and_then(Value::as_str)
            .map(Self::parse)
    }

    /// Whether the response has not settled yet
    pub fn is_pending(&self) -> bool {
        matches!(self, ResponseStatus::Queued | ResponseStatus::InProgress)
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            ResponseStatus::Completed => "completed",
            ResponseStatus::Incomplete => "incomplete",
            ResponseStatus::Queued => "queued",
            ResponseStatus::InProgress => "in_progress",
            ResponseStatus::Other(other) => other,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
}

impl TokenUsage {
    /// Read the `usage` object of a raw response.
    ///
    /// Accepts both Responses API names (`input_tokens`) and chat-style names
    /// (`prompt_tokens`). Returns `None` when no usage is reported.
    pub fn from_response(response: &Value) -> Option<Self> {
        let usage = response.get("usage").filter(|usage| usage.is_object())?;
        let field = |primary: &str, legacy: &str| {
            usage
                .get(primary)
                .or_else(|| usage.get(legacy))
                .and_then(Value::as_u64)
        };

        let reasoning_tokens = ["output_tokens_details", "completion_tokens_details"]
            .iter()
            .find_map(|details| {
                usage
                    .get(*details)
                    .and_then(|d| d.get("reasoning_tokens"))
                    .and_then(Value::as_u64)
            });

        Some(Self {
            input_tokens: field("input_tokens", "prompt_tokens"),
            output_tokens: field("output_tokens", "completion_tokens"),
            total_tokens: usage.get("total_tokens").and_then(Value::as_u64),
            reasoning_tokens,
        })
    }
}

/// Non-empty `id` of a raw response
pub fn response_id(response: &Value) -> Option<String> {
    response
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// `incomplete_details.reason` of a raw response
pub fn incomplete_reason(response: &Value) -> Option<String> {
    response
        .get("incomplete_details")
        .and_then(|details| details.get("reason"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_omits_empty_fields() {
        let request = ResponseRequest::new("gpt-4.1-mini", "hello").max_output_tokens(1200);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value, json!({"model": "gpt-4.1-mini", "input": "hello", "max_output_tokens": 1200}));
    }

    #[test]
    fn test_request_with_tool_and_continuation() {
        let request = ResponseRequest::new("m", "x")
            .tool(ToolSpec::new("web_search"))
            .previous_response_id("resp_1");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["tools"], json!([{"type": "web_search"}]));
        assert_eq!(value["previous_response_id"], "resp_1");
        assert!(request.has_tools());
    }

    #[test]
    fn test_status_parsing() {
        assert!(ResponseStatus::parse("queued").is_pending());
        assert!(ResponseStatus::parse("in_progress").is_pending());
        assert!(!ResponseStatus::parse("completed").is_pending());
        assert_eq!(ResponseStatus::parse("failed"), ResponseStatus::Other("failed".to_string()));
        assert_eq!(ResponseStatus::from_response(&json!({"id": "r"})), None);
    }

    #[test]
    fn test_usage_reads_both_naming_schemes() {
        let responses = json!({
            "usage": {
                "input_tokens": 40,
                "output_tokens": 1000,
                "total_tokens": 1040,
                "output_tokens_details": {"reasoning_tokens": 960}
            }
        });
        let usage = TokenUsage::from_response(&responses).unwrap();
        assert_eq!(usage.output_tokens, Some(1000));
        assert_eq!(usage.reasoning_tokens, Some(960));

        let chat = json!({"usage": {"prompt_tokens": 13, "completion_tokens": 7, "total_tokens": 20}});
        let usage = TokenUsage::from_response(&chat).unwrap();
        assert_eq!(usage.input_tokens, Some(13));
        assert_eq!(usage.output_tokens, Some(7));
        assert_eq!(usage.reasoning_tokens, None);

        assert!(TokenUsage::from_response(&json!({})).is_none());
    }

    #[test]
    fn test_id_and_incomplete_reason() {
        let response = json!({"id": "resp_9", "incomplete_details": {"reason": "max_output_tokens"}});
        assert_eq!(response_id(&response).as_deref(), Some("resp_9"));
        assert_eq!(incomplete_reason(&response).as_deref(), Some("max_output_tokens"));
        assert_eq!(response_id(&json!({"id": "  "})), None);
    }
}
