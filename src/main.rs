use anyhow::{anyhow, Context, Result};
use embedding_lab_api::{ApiServer, Settings};
use embedding_lab_core::LabCore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embedding_lab=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting embedding lab API...");

    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    if settings.openai.api_key.is_none() {
        warn!("No OpenAI API key configured, requests must send the x-api-key header");
    }

    let core = LabCore::new(settings.core_config())
        .await
        .context("Failed to initialize the vector store")?;

    let server = ApiServer::new(settings.api_config(), Arc::new(core));
    server
        .health_check()
        .await
        .map_err(|e| anyhow!("Startup health check failed: {}", e))?;

    server
        .start()
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    Ok(())
}
