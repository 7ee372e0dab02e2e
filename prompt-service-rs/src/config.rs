//! Service configuration
//!
//! Everything is read once at startup into an immutable [`ImproveConfig`] that
//! is shared by the router and the escalation pipeline.

use std::time::Duration;

use config_rs::{ConfigProvider, ConfigProviderExt, EnvConfigProvider};
use llm_sdk::{OpenAIConfig, PollConfig, Resilience, RetryConfig, ServiceError};

/// Service name used for `{NAME}_SERVICE_PORT` / `{NAME}_SERVICE_ADDR`
pub const SERVICE_NAME: &str = "PROMPT";

/// Listen port when neither `PROMPT_SERVICE_PORT` nor `PORT` is set
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_WEB_SEARCH_TOOL: &str = "web_search";
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 6_000;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_TIMEOUT_RETRIES: u32 = 2;
pub const DEFAULT_TIMEOUT_RETRY_STEP_MS: u64 = 15_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_200;
pub const DEFAULT_POLL_MAX_WAIT_MS: u64 = 45_000;

/// Settings for the `/api/improve` endpoint
#[derive(Debug, Clone)]
pub struct ImproveConfig {
    /// Upstream provider connection
    pub provider: OpenAIConfig,
    /// Model name sent with every request
    pub model: String,
    /// Tool type sent on web-search steps
    pub web_search_tool: String,
    /// Prompt length cap in characters, after normalization
    pub max_prompt_chars: usize,
    /// Output token cap, raised to each step's floor when lower
    pub max_output_tokens: u32,
    /// Deadline for the first attempt of every step
    pub initial_timeout: Duration,
    /// Retry-on-timeout policy
    pub retry: RetryConfig,
    /// Completion polling policy
    pub poll: PollConfig,
    /// Log every debug payload
    pub debug_trace_log: bool,
}

impl Default for ImproveConfig {
    fn default() -> Self {
        let initial_timeout = Duration::from_millis(DEFAULT_TIMEOUT_MS);
        Self {
            provider: OpenAIConfig::default(),
            model: DEFAULT_MODEL.to_string(),
            web_search_tool: DEFAULT_WEB_SEARCH_TOOL.to_string(),
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            initial_timeout,
            retry: RetryConfig {
                max_retries: DEFAULT_TIMEOUT_RETRIES,
                timeout_step: Duration::from_millis(DEFAULT_TIMEOUT_RETRY_STEP_MS),
            },
            poll: PollConfig {
                interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
                max_wait: Duration::from_millis(DEFAULT_POLL_MAX_WAIT_MS),
                fetch_timeout: initial_timeout,
            },
            debug_trace_log: false,
        }
    }
}

impl ImproveConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_provider(&EnvConfigProvider::new())
    }

    /// Load from any configuration provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self, ServiceError> {
        let initial_timeout = Duration::from_millis(positive_or(
            provider.get_or("openai_timeout_ms", DEFAULT_TIMEOUT_MS),
            DEFAULT_TIMEOUT_MS,
        ));

        Ok(Self {
            provider: OpenAIConfig::from_provider(provider)?,
            model: provider.get_string_or("openai_model", DEFAULT_MODEL),
            web_search_tool: provider.get_string_or("web_search_tool", DEFAULT_WEB_SEARCH_TOOL),
            max_prompt_chars: positive_or(
                provider.get_or("max_prompt_chars", DEFAULT_MAX_PROMPT_CHARS),
                DEFAULT_MAX_PROMPT_CHARS,
            ),
            max_output_tokens: positive_or(
                provider.get_or("max_output_tokens", DEFAULT_MAX_OUTPUT_TOKENS),
                DEFAULT_MAX_OUTPUT_TOKENS,
            ),
            initial_timeout,
            retry: RetryConfig {
                max_retries: provider.get_or("openai_timeout_retries", DEFAULT_TIMEOUT_RETRIES),
                timeout_step: Duration::from_millis(
                    provider.get_or("openai_timeout_retry_step_ms", DEFAULT_TIMEOUT_RETRY_STEP_MS),
                ),
            },
            poll: PollConfig {
                interval: Duration::from_millis(positive_or(
                    provider.get_or("openai_poll_interval_ms", DEFAULT_POLL_INTERVAL_MS),
                    DEFAULT_POLL_INTERVAL_MS,
                )),
                max_wait: Duration::from_millis(
                    provider.get_or("openai_poll_max_wait_ms", DEFAULT_POLL_MAX_WAIT_MS),
                ),
                fetch_timeout: initial_timeout,
            },
            debug_trace_log: provider.get_bool_or("debug_trace_log", false),
        })
    }

    /// Whether the provider credential is configured
    pub fn has_credential(&self) -> bool {
        self.provider.has_credential()
    }

    /// Resilience facade built from the retry and poll settings
    pub fn resilience(&self) -> Resilience {
        Resilience::new(self.retry.clone(), self.poll.clone())
    }
}

/// Zero is never a usable cap or interval
fn positive_or<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() {
        tracing::warn!("Zero is not a valid setting here, using the default");
        default
    } else {
        value
    }
}
