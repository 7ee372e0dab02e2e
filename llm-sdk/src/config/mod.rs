//! Provider configuration for the Responses API client
//!
//! Settings are read through a `config_rs::ConfigProvider`, so the same code
//! loads from the process environment in production and from a
//! `MemoryConfigProvider` in tests.

use std::fmt;

use config_rs::{ConfigProvider, ConfigProviderExt};

use crate::error::{Result, ServiceError};

/// Default per-request ceiling applied by the HTTP client itself. Tighter
/// deadlines are enforced by the resilience layer.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 300;

/// Common interface for validated client configurations
pub trait ServiceConfig: fmt::Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Upstream providers that speak the Responses API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    OpenRouter,
}

impl Provider {
    /// Parse a provider name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAI),
            "openrouter" => Some(Provider::OpenRouter),
            _ => None,
        }
    }

    /// Name used in logs and error contexts
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::OpenRouter => "openrouter",
        }
    }

    /// Base URL used when `llm_base_url` is not set
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Configuration key holding this provider's credential
    pub fn api_key_setting(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai_api_key",
            Provider::OpenRouter => "openrouter_api_key",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection settings for the Responses API
#[derive(Clone)]
pub struct OpenAIConfig {
    /// Selected provider
    pub provider: Provider,

    /// API key; empty when no credential is configured
    pub api_key: String,

    /// Organization ID (OpenAI only, optional)
    pub org_id: Option<String>,

    /// Base URL without trailing slash
    pub base_url: String,

    /// HTTP client ceiling in seconds
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            api_key: String::new(),
            org_id: None,
            base_url: Provider::OpenAI.default_base_url().to_string(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
        }
    }
}

// Manual impl so the credential never ends up in a log line
impl fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.has_credential() { "[REDACTED]" } else { "" })
            .field("org_id", &self.org_id)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl OpenAIConfig {
    /// Load configuration from a config provider.
    ///
    /// A missing credential is not an error here: the service still starts and
    /// reports the misconfiguration per request.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let provider_name = provider.get_string_or("llm_provider", "openai");
        let selected = Provider::parse(&provider_name).unwrap_or_else(|| {
            tracing::warn!(provider = %provider_name, "Unknown LLM provider, using openai");
            Provider::OpenAI
        });

        let api_key = provider
            .get_optional(selected.api_key_setting())
            .unwrap_or_default();
        let base_url = provider
            .get_string_or("llm_base_url", selected.default_base_url())
            .trim_end_matches('/')
            .to_string();
        let org_id = match selected {
            Provider::OpenAI => provider.get_optional("openai_org_id"),
            Provider::OpenRouter => None,
        };
        let timeout_seconds =
            provider.get_or::<u64>("llm_http_timeout_seconds", DEFAULT_HTTP_TIMEOUT_SECONDS);

        if base_url.is_empty() {
            return Err(ServiceError::configuration("LLM base URL must not be empty"));
        }

        Ok(Self {
            provider: selected,
            api_key,
            org_id,
            base_url,
            timeout_seconds,
        })
    }

    /// Whether a credential is configured
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Full URL for an endpoint relative to the base URL
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl ServiceConfig for OpenAIConfig {
    fn validate(&self) -> Result<()> {
        if !self.has_credential() {
            return Err(ServiceError::configuration(format!(
                "Missing {} for provider {}",
                self.provider.api_key_setting().to_uppercase(),
                self.provider
            )));
        }

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("LLM base URL is required"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        self.provider.name()
    }
}
