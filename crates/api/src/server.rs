use crate::{
    middleware::{
        cors_layer, error_handling_middleware, request_id_middleware, request_logging_middleware,
    },
    routes::{create_routes, not_found_handler},
    ApiConfig,
};
use axum::{extract::DefaultBodyLimit, Router};
use embedding_lab_core::{store::StoreStatus, LabCore};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct ApiServer {
    config: ApiConfig,
    core: Arc<LabCore>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, core: Arc<LabCore>) -> Self {
        Self { config, core }
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.create_app();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        info!("Starting API server on {}", addr);
        info!("CORS origins: {:?}", self.config.cors_origins);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("API server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped");
        Ok(())
    }

    pub fn create_app(&self) -> Router {
        Router::new()
            .merge(create_routes(self.core.clone()))
            // Fallback for unmatched routes
            .fallback(not_found_handler)
            .layer(
                ServiceBuilder::new()
                    // Outermost layers (applied last)
                    .layer(TraceLayer::new_for_http())
                    .layer(cors_layer(&self.config))
                    .layer(DefaultBodyLimit::max(self.config.max_request_size))
                    // Logging and request tracking
                    .layer(axum::middleware::from_fn(request_id_middleware))
                    .layer(axum::middleware::from_fn(request_logging_middleware))
                    .layer(axum::middleware::from_fn(error_handling_middleware)),
            )
    }

    pub async fn health_check(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let store_health = self.core.store.health_check().await?;

        match store_health.status {
            StoreStatus::Healthy => {
                info!(
                    "Vector store health check passed (collection {})",
                    store_health.collection
                );
            }
            StoreStatus::Unhealthy => {
                error!("Vector store health check failed: {:?}", store_health);
                return Err("Vector store health check failed".into());
            }
        }

        info!("API server health check passed");
        Ok(())
    }

    pub fn get_config(&self) -> &ApiConfig {
        &self.config
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
