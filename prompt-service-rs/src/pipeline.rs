//! Escalation pipeline
//!
//! An improve request runs through a fixed list of upstream attempts. Each
//! entry pairs a step with a trigger on the previous attempt; the list is
//! walked once and the first attempt that yields text or a refusal ends the
//! run. Every attempt that settles is recorded in the trace, including the
//! one that ended the run.
//!
//! Timeouts on the create call are retried with a widening deadline by the
//! shared [`Resilience`] facade. Any error that survives it aborts the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use llm_sdk::util::elapsed_ms;
use llm_sdk::{Resilience, ResponseRequest, ResponsesApi, ServiceError, ToolSpec};

use crate::config::ImproveConfig;
use crate::extract::{extract_output_text, extract_refusal};
use crate::instructions::{step_input, system_instructions};
use crate::trace::{AttemptStep, UpstreamAttempt};

/// Output token floor of the first step
const INITIAL_TOKEN_FLOOR: u32 = 1_200;
/// Output token floor of every later step
const RETRY_TOKEN_FLOOR: u32 = 1_600;
/// Floor used after an attempt ran out of output tokens
const EXHAUSTED_TOKEN_FLOOR: u32 = 2_600;

/// Decides whether a step runs, given the attempt before it
type Trigger = fn(Option<&UpstreamAttempt>) -> bool;

struct StepPlan {
    step: AttemptStep,
    trigger: Trigger,
}

const PLAN: [StepPlan; 5] = [
    StepPlan {
        step: AttemptStep::InitialWebSearch,
        trigger: always,
    },
    StepPlan {
        step: AttemptStep::RetryWebSearchDirectText,
        trigger: always,
    },
    StepPlan {
        step: AttemptStep::FinalizeFromPreviousWebSearch,
        trigger: has_continuable_response,
    },
    StepPlan {
        step: AttemptStep::RetryModelOnly,
        trigger: always,
    },
    StepPlan {
        step: AttemptStep::FinalizeFromPreviousModelOnly,
        trigger: has_continuable_response,
    },
];

fn always(_previous: Option<&UpstreamAttempt>) -> bool {
    true
}

fn has_continuable_response(previous: Option<&UpstreamAttempt>) -> bool {
    previous.is_some_and(|attempt| attempt.response_id.is_some())
}

/// Per-request settings taken from [`ImproveConfig`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub web_search_tool: String,
    pub max_output_tokens: u32,
    pub initial_timeout: Duration,
}

impl From<&ImproveConfig> for PipelineSettings {
    fn from(config: &ImproveConfig) -> Self {
        Self {
            model: config.model.clone(),
            web_search_tool: config.web_search_tool.clone(),
            max_output_tokens: config.max_output_tokens,
            initial_timeout: config.initial_timeout,
        }
    }
}

/// Terminal result of one run
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The model produced the improved prompt
    Text {
        output: String,
        step: AttemptStep,
        recovered_from_empty: bool,
        used_no_web_recovery: bool,
        used_web_search: bool,
    },
    /// The model declined
    Refusal(String),
    /// Every step came back empty
    LocalFallback,
    /// An upstream failure aborted the run
    UpstreamError(ServiceError),
}

/// Outcome plus the ordered trace of settled attempts
#[derive(Debug)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub trace: Vec<UpstreamAttempt>,
}

pub struct EscalationPipeline {
    api: Arc<dyn ResponsesApi>,
    resilience: Resilience,
    settings: PipelineSettings,
}

impl EscalationPipeline {
    pub fn new(api: Arc<dyn ResponsesApi>, resilience: Resilience, settings: PipelineSettings) -> Self {
        Self {
            api,
            resilience,
            settings,
        }
    }

    /// Run every step in order until one yields text or a refusal
    pub async fn run(&self, prompt: &str) -> PipelineRun {
        let mut trace: Vec<UpstreamAttempt> = Vec::new();

        for plan in PLAN.iter() {
            let previous = trace.last();
            if !(plan.trigger)(previous) {
                tracing::debug!(step = plan.step.as_str(), "Skipping step, no response to continue");
                continue;
            }

            let request = self.build_request(plan.step, prompt, previous);
            let started = Instant::now();

            let response = match self.attempt(plan.step, &request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(step = plan.step.as_str(), error = %err.kind(), "Upstream attempt failed");
                    return PipelineRun {
                        outcome: PipelineOutcome::UpstreamError(err),
                        trace,
                    };
                }
            };

            let text = extract_output_text(&response);
            let refusal = extract_refusal(&response);
            let attempt = UpstreamAttempt::record(
                plan.step,
                elapsed_ms(started),
                request.max_output_tokens.unwrap_or(self.settings.max_output_tokens),
                &response,
                &text,
                &refusal,
            );

            tracing::info!(
                step = plan.step.as_str(),
                elapsed_ms = attempt.elapsed_ms,
                status = attempt.status.as_deref().unwrap_or("unknown"),
                output_types = ?attempt.output_types,
                has_output_text = attempt.has_output_text,
                has_refusal = attempt.has_refusal,
                "Upstream attempt settled"
            );
            trace.push(attempt);

            if !text.is_empty() {
                return PipelineRun {
                    outcome: PipelineOutcome::Text {
                        output: text,
                        step: plan.step,
                        recovered_from_empty: plan.step != AttemptStep::InitialWebSearch,
                        used_no_web_recovery: !plan.step.uses_web_search(),
                        used_web_search: plan.step.uses_web_search(),
                    },
                    trace,
                };
            }

            if !refusal.is_empty() {
                return PipelineRun {
                    outcome: PipelineOutcome::Refusal(refusal),
                    trace,
                };
            }
        }

        tracing::warn!(attempts = trace.len(), "Every escalation step came back empty");
        PipelineRun {
            outcome: PipelineOutcome::LocalFallback,
            trace,
        }
    }

    /// Create the response, retrying timeouts, then wait for it to settle
    async fn attempt(&self, step: AttemptStep, request: &ResponseRequest) -> Result<Value, ServiceError> {
        let api = &self.api;

        let created = self
            .resilience
            .call(step.as_str(), self.settings.initial_timeout, || api.create_response(request))
            .await?;

        self.resilience
            .settle(created, |id| async move { api.retrieve_response(&id).await })
            .await
    }

    fn build_request(&self, step: AttemptStep, prompt: &str, previous: Option<&UpstreamAttempt>) -> ResponseRequest {
        let mut request = ResponseRequest::new(&self.settings.model, step_input(step, prompt))
            .instructions(system_instructions(step))
            .max_output_tokens(self.token_budget(step, previous));

        if step.uses_web_search() {
            request = request.tool(ToolSpec::new(&self.settings.web_search_tool));
        }

        if step.is_continuation() {
            if let Some(id) = previous.and_then(|attempt| attempt.response_id.as_deref()) {
                request = request.previous_response_id(id);
            }
        }

        request
    }

    fn token_budget(&self, step: AttemptStep, previous: Option<&UpstreamAttempt>) -> u32 {
        let floor = match step {
            AttemptStep::InitialWebSearch => INITIAL_TOKEN_FLOOR,
            _ if previous.is_some_and(UpstreamAttempt::hit_token_limit) => EXHAUSTED_TOKEN_FLOOR,
            _ => RETRY_TOKEN_FLOOR,
        };

        self.settings.max_output_tokens.max(floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use llm_sdk::{PollConfig, RetryConfig};
    use serde_json::json;

    /// Replays canned results and records every request it receives
    #[derive(Default)]
    struct ScriptedApi {
        creates: Mutex<VecDeque<llm_sdk::Result<Value>>>,
        retrieves: Mutex<VecDeque<llm_sdk::Result<Value>>>,
        requests: Mutex<Vec<ResponseRequest>>,
    }

    impl ScriptedApi {
        fn with_creates(creates: Vec<llm_sdk::Result<Value>>) -> Self {
            Self {
                creates: Mutex::new(creates.into()),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<ResponseRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResponsesApi for ScriptedApi {
        async fn create_response(&self, request: &ResponseRequest) -> llm_sdk::Result<Value> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.creates.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(ServiceError::internal("script exhausted")))
        }

        async fn retrieve_response(&self, _response_id: &str) -> llm_sdk::Result<Value> {
            let next = self.retrieves.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(ServiceError::internal("script exhausted")))
        }
    }

    fn settings(max_output_tokens: u32) -> PipelineSettings {
        PipelineSettings {
            model: "gpt-4.1-mini".to_string(),
            web_search_tool: "web_search".to_string(),
            max_output_tokens,
            initial_timeout: Duration::from_millis(30_000),
        }
    }

    fn pipeline(api: Arc<ScriptedApi>) -> EscalationPipeline {
        EscalationPipeline::new(api, Resilience::default(), settings(1_000))
    }

    fn text(id: &str, body: &str) -> llm_sdk::Result<Value> {
        Ok(json!({
            "id": id,
            "status": "completed",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": body}]}]
        }))
    }

    fn empty(id: &str) -> llm_sdk::Result<Value> {
        Ok(json!({"id": id, "status": "completed", "output": [{"type": "web_search_call"}]}))
    }

    fn steps(run: &PipelineRun) -> Vec<AttemptStep> {
        run.trace.iter().map(|attempt| attempt.step).collect()
    }

    #[tokio::test]
    async fn test_first_attempt_text() {
        let api = Arc::new(ScriptedApi::with_creates(vec![text("resp_1", "Improved prompt")]));
        let run = pipeline(api.clone()).run("scrivi un post").await;

        match run.outcome {
            PipelineOutcome::Text {
                ref output,
                recovered_from_empty,
                used_web_search,
                ..
            } => {
                assert_eq!(output, "Improved prompt");
                assert!(!recovered_from_empty);
                assert!(used_web_search);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(steps(&run), vec![AttemptStep::InitialWebSearch]);

        let requests = api.requests();
        assert_eq!(requests[0].max_output_tokens, Some(1_200));
        assert_eq!(requests[0].tools, vec![ToolSpec::new("web_search")]);
        assert!(requests[0].previous_response_id.is_none());
    }

    #[tokio::test]
    async fn test_token_exhaustion_raises_next_floor() {
        let api = Arc::new(ScriptedApi::with_creates(vec![
            Ok(json!({
                "id": "resp_1",
                "status": "incomplete",
                "incomplete_details": {"reason": "max_output_tokens"},
                "output": [{"type": "reasoning"}]
            })),
            text("resp_2", "Recovered"),
        ]));
        let run = pipeline(api.clone()).run("prompt").await;

        match run.outcome {
            PipelineOutcome::Text {
                recovered_from_empty,
                used_no_web_recovery,
                step,
                ..
            } => {
                assert!(recovered_from_empty);
                assert!(!used_no_web_recovery);
                assert_eq!(step, AttemptStep::RetryWebSearchDirectText);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(run.trace.len(), 2);
        assert_eq!(api.requests()[1].max_output_tokens, Some(2_600));
    }

    #[tokio::test]
    async fn test_all_steps_empty_falls_back() {
        let api = Arc::new(ScriptedApi::with_creates(vec![
            empty("resp_1"),
            empty("resp_2"),
            empty("resp_3"),
            empty("resp_4"),
            empty("resp_5"),
        ]));
        let run = pipeline(api.clone()).run("prompt").await;

        assert!(matches!(run.outcome, PipelineOutcome::LocalFallback));
        assert_eq!(
            steps(&run),
            vec![
                AttemptStep::InitialWebSearch,
                AttemptStep::RetryWebSearchDirectText,
                AttemptStep::FinalizeFromPreviousWebSearch,
                AttemptStep::RetryModelOnly,
                AttemptStep::FinalizeFromPreviousModelOnly,
            ]
        );

        let requests = api.requests();
        assert_eq!(requests[2].previous_response_id.as_deref(), Some("resp_2"));
        assert_eq!(requests[4].previous_response_id.as_deref(), Some("resp_4"));
        assert!(requests[3].tools.is_empty());
        assert!(requests[4].tools.is_empty());
        assert_eq!(requests[1].max_output_tokens, Some(1_600));
    }

    #[tokio::test]
    async fn test_continuations_skipped_without_response_id() {
        let no_id = || -> llm_sdk::Result<Value> { Ok(json!({"status": "completed", "output": []})) };
        let api = Arc::new(ScriptedApi::with_creates(vec![no_id(), no_id(), no_id()]));
        let run = pipeline(api).run("prompt").await;

        assert!(matches!(run.outcome, PipelineOutcome::LocalFallback));
        assert_eq!(
            steps(&run),
            vec![
                AttemptStep::InitialWebSearch,
                AttemptStep::RetryWebSearchDirectText,
                AttemptStep::RetryModelOnly,
            ]
        );
    }

    #[tokio::test]
    async fn test_model_only_recovery() {
        let api = Arc::new(ScriptedApi::with_creates(vec![
            empty("resp_1"),
            empty("resp_2"),
            empty("resp_3"),
            text("resp_4", "No-web text"),
        ]));
        let run = pipeline(api).run("prompt").await;

        match run.outcome {
            PipelineOutcome::Text {
                used_no_web_recovery,
                used_web_search,
                ..
            } => {
                assert!(used_no_web_recovery);
                assert!(!used_web_search);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(run.trace.len(), 4);
    }

    #[tokio::test]
    async fn test_refusal_stops_escalation() {
        let api = Arc::new(ScriptedApi::with_creates(vec![
            empty("resp_1"),
            Ok(json!({
                "id": "resp_2",
                "status": "completed",
                "output": [{"type": "message", "content": [{"type": "refusal", "refusal": "I can't help."}]}]
            })),
        ]));
        let run = pipeline(api.clone()).run("prompt").await;

        assert!(matches!(run.outcome, PipelineOutcome::Refusal(ref r) if r == "I can't help."));
        assert_eq!(run.trace.len(), 2);
        assert!(run.trace[1].has_refusal);
        assert_eq!(api.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_non_timeout_error_aborts_with_trace() {
        let api = Arc::new(ScriptedApi::with_creates(vec![
            empty("resp_1"),
            Err(ServiceError::validation("bad tool")),
        ]));
        let run = pipeline(api.clone()).run("prompt").await;

        match run.outcome {
            PipelineOutcome::UpstreamError(err) => assert_eq!(err.kind(), "validation"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(run.trace.len(), 1);
        assert_eq!(api.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_response_is_polled() {
        let api = Arc::new(ScriptedApi {
            creates: Mutex::new(vec![Ok(json!({"id": "resp_1", "status": "queued"}))].into()),
            retrieves: Mutex::new(
                vec![
                    Ok(json!({"id": "resp_1", "status": "in_progress"})),
                    text("resp_1", "Settled text"),
                ]
                .into(),
            ),
            ..ScriptedApi::default()
        });
        let resilience = Resilience::new(RetryConfig::default(), PollConfig::default());
        let run = EscalationPipeline::new(api, resilience, settings(1_000)).run("prompt").await;

        assert!(matches!(run.outcome, PipelineOutcome::Text { ref output, .. } if output == "Settled text"));
        assert_eq!(run.trace[0].status.as_deref(), Some("completed"));
    }

    #[test]
    fn test_configured_cap_above_floor_wins() {
        let pipeline = EscalationPipeline::new(
            Arc::new(ScriptedApi::default()),
            Resilience::default(),
            settings(4_000),
        );
        assert_eq!(pipeline.token_budget(AttemptStep::InitialWebSearch, None), 4_000);
        assert_eq!(pipeline.token_budget(AttemptStep::RetryModelOnly, None), 4_000);
    }
}
