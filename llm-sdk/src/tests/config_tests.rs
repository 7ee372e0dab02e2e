//! Tests for provider configuration

#[cfg(test)]
mod tests {
    use config_rs::MemoryConfigProvider;

    use crate::config::{OpenAIConfig, Provider, ServiceConfig, DEFAULT_HTTP_TIMEOUT_SECONDS};

    #[test]
    fn test_openai_defaults() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("openai_api_key", "sk-test-1234567890");

        let config = OpenAIConfig::from_provider(&provider).unwrap();

        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout_seconds, DEFAULT_HTTP_TIMEOUT_SECONDS);
        assert!(config.has_credential());
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint_url("/responses"), "https://api.openai.com/v1/responses");
    }

    #[test]
    fn test_openrouter_selection_and_override() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("llm_provider", "OpenRouter");
        provider.set("openrouter_api_key", "sk-or-v1-abcdef123456");
        provider.set("openai_api_key", "sk-ignored-0000000000");
        provider.set("llm_base_url", "http://localhost:9999/api/v1/");

        let config = OpenAIConfig::from_provider(&provider).unwrap();

        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.api_key, "sk-or-v1-abcdef123456");
        assert_eq!(config.base_url, "http://localhost:9999/api/v1");
        assert_eq!(config.service_name(), "openrouter");
    }

    #[test]
    fn test_missing_credential_loads_but_fails_validation() {
        let provider = MemoryConfigProvider::new();

        let config = OpenAIConfig::from_provider(&provider).unwrap();

        assert!(!config.has_credential());
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_unknown_provider_falls_back_to_openai() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("llm_provider", "acme");

        let config = OpenAIConfig::from_provider(&provider).unwrap();
        assert_eq!(config.provider, Provider::OpenAI);
    }

    #[test]
    fn test_debug_output_hides_credential() {
        let config = OpenAIConfig {
            api_key: "sk-secret-value-123456".to_string(),
            ..OpenAIConfig::default()
        };

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
