// prompt-service-rs/src/main.rs
// Prompt improver HTTP service
//
// POST /api/improve - rewrite a prompt through the upstream Responses API
// GET  /health      - liveness probe

use std::sync::Arc;

use config_rs::{get_bind_address, get_formatted_service_name, load_dotenv};
use error_handling_rs::{init_logging, LoggingConfig};
use prompt_service::config::{ImproveConfig, DEFAULT_PORT, SERVICE_NAME};
use prompt_service::ImproveService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    load_dotenv();

    init_logging(Some(LoggingConfig::from_env(get_formatted_service_name(SERVICE_NAME))))?;

    let config = ImproveConfig::from_env()?;
    if !config.has_credential() {
        tracing::warn!(
            provider = %config.provider.provider,
            "No API key configured, /api/improve will answer 500 until one is set"
        );
    }

    tracing::info!(
        provider = %config.provider.provider,
        model = %config.model,
        retry = %config.retry,
        "Prompt service configured"
    );

    let service = Arc::new(ImproveService::from_config(config)?);
    let app = service.create_router();

    let addr = get_bind_address(SERVICE_NAME, DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Prompt service listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
