//! Prompt improver service
//!
//! Turns a vague user prompt into a specific one through the upstream
//! Responses API. The orchestration in [`pipeline`] escalates through five
//! attempts when the model comes back empty, and [`fallback`] produces a
//! template prompt locally when the upstream cannot help at all.

pub mod config;
pub mod extract;
pub mod fallback;
pub mod handlers;
pub mod instructions;
pub mod pipeline;
pub mod trace;
pub mod validation;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use llm_sdk::{ResponsesApi, ResponsesClient, ServiceError};

use crate::config::ImproveConfig;
use crate::pipeline::{EscalationPipeline, PipelineSettings};

pub use handlers::DEBUG_REQUEST_ID_HEADER;

/// Shared application state
pub struct ImproveService {
    config: ImproveConfig,
    pipeline: EscalationPipeline,
}

impl ImproveService {
    /// Create the service around any Responses API implementation
    pub fn new(config: ImproveConfig, api: Arc<dyn ResponsesApi>) -> Self {
        let pipeline = EscalationPipeline::new(api, config.resilience(), PipelineSettings::from(&config));
        Self { config, pipeline }
    }

    /// Create the service with an HTTP client for the configured provider
    pub fn from_config(config: ImproveConfig) -> Result<Self, ServiceError> {
        let client = ResponsesClient::new(config.provider.clone())?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &ImproveConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &EscalationPipeline {
        &self.pipeline
    }

    /// Build the HTTP router
    pub fn create_router(self: Arc<Self>) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        // The request id wraps the body limit so rejected bodies still carry it
        let improve: Router<Arc<Self>> = Router::new()
            .route(
                "/api/improve",
                post(handlers::improve_handler).fallback(handlers::method_not_allowed),
            )
            .layer(validation::payload_limit_config())
            .layer(middleware::from_fn(handlers::attach_request_id));

        Router::new()
            .route("/health", get(handlers::health_handler))
            .merge(improve)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self)
    }
}
