//! Responses API client implementation
//!
//! This module provides the client for the OpenAI Responses API. OpenRouter
//! exposes the same endpoints, so one client serves both providers.

mod models;
pub use models::*;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{OpenAIConfig, Provider};
use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, parse_error_response, UserAgent};

/// Operations the prompt service needs from the upstream provider
#[async_trait]
pub trait ResponsesApi: Send + Sync {
    /// `POST /responses`
    async fn create_response(&self, request: &ResponseRequest) -> Result<Value>;

    /// `GET /responses/{id}`
    async fn retrieve_response(&self, response_id: &str) -> Result<Value>;
}

/// Responses API client
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: OpenAIConfig,
}

impl ResponsesClient {
    /// Create a new client with the given configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let http_client = build_http_client(
            Some(UserAgent::default()),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self { http_client, config })
    }

    /// Create a new builder for the client
    pub fn builder() -> ResponsesClientBuilder {
        ResponsesClientBuilder::default()
    }

    /// Get the configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Attach credentials and provider headers
    fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        if !self.config.has_credential() {
            return Err(ServiceError::configuration(format!(
                "No API key configured for {}",
                self.config.provider
            )));
        }

        let mut builder = builder.bearer_auth(&self.config.api_key);

        if let Some(ref org) = self.config.org_id {
            builder = builder.header("OpenAI-Organization", org);
        }

        if self.config.provider == Provider::OpenRouter {
            builder = builder.header("X-Title", "prompt-service");
        }

        Ok(builder)
    }

    async fn post_json<T>(&self, endpoint: &str, body: &T) -> Result<Value>
    where
        T: Serialize + Sync,
    {
        let url = self.config.endpoint_url(endpoint);
        debug!(provider = %self.config.provider, "Sending request: POST {}", url);

        let builder = self.authorize(self.http_client.post(&url))?.json(body);
        self.send(endpoint, builder).await
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value> {
        let url = self.config.endpoint_url(endpoint);
        debug!(provider = %self.config.provider, "Sending request: GET {}", url);

        let builder = self.authorize(self.http_client.get(&url))?;
        self.send(endpoint, builder).await
    }

    async fn send(&self, endpoint: &str, builder: RequestBuilder) -> Result<Value> {
        let start_time = Instant::now();
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(parse_error_response(self.config.provider.name(), endpoint, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::network(format!("Failed to read response body: {}", e)))?;

        debug!(
            endpoint = %endpoint,
            status = status.as_u16(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Upstream response received"
        );

        serde_json::from_str::<Value>(&body).map_err(|e| {
            ServiceError::parsing(format!(
                "Failed to parse response: {} (body: {})",
                e,
                crate::util::truncate_string(&body, 120)
            ))
        })
    }
}

#[async_trait]
impl ResponsesApi for ResponsesClient {
    async fn create_response(&self, request: &ResponseRequest) -> Result<Value> {
        self.post_json("responses", request).await
    }

    async fn retrieve_response(&self, response_id: &str) -> Result<Value> {
        self.get_json(&format!("responses/{}", response_id)).await
    }
}

/// Builder for the Responses API client
#[derive(Default)]
pub struct ResponsesClientBuilder {
    /// Base configuration
    config: Option<OpenAIConfig>,

    /// Provider override
    provider: Option<Provider>,

    /// API key for authentication
    api_key: Option<String>,

    /// Base URL for the API
    base_url: Option<String>,

    /// Request timeout
    timeout_seconds: Option<u64>,
}

impl ResponsesClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: OpenAIConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the provider
    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ResponsesClient> {
        let mut config = self.config.unwrap_or_default();

        if let Some(provider) = self.provider {
            config.provider = provider;
        }

        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }

        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }

        if config.base_url.is_empty() {
            return Err(ServiceError::configuration("Base URL is required"));
        }

        ResponsesClient::new(config)
    }
}
