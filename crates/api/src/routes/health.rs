use crate::{create_success_response, HealthCheck, ServiceHealth};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use embedding_lab_common::ApiResponse;
use embedding_lab_core::{store::StoreStatus, LabCore};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};

#[derive(Clone)]
struct HealthState {
    core: Arc<LabCore>,
    started: Instant,
}

pub fn routes(core: Arc<LabCore>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .with_state(HealthState {
            core,
            started: Instant::now(),
        })
}

// Basic health check endpoint
async fn health_check(State(state): State<HealthState>) -> Json<ApiResponse<HealthCheck>> {
    debug!("Health check requested");

    let (store, collection) = match state.core.store.health_check().await {
        Ok(health) => (status_label(&health.status), health.collection),
        Err(e) => {
            warn!("Store health check failed: {}", e);
            ("unhealthy", String::new())
        }
    };
    let vectors = state.core.vectors_count().await.ok();

    let health = HealthCheck {
        status: if store == "healthy" { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.started.elapsed().as_secs(),
        services: ServiceHealth {
            store: store.to_string(),
            collection,
            vectors,
        },
    };

    create_success_response(health)
}

// Readiness probe, fails while the vector store is unreachable
async fn readiness_check(
    State(state): State<HealthState>,
) -> (StatusCode, Json<serde_json::Value>) {
    debug!("Readiness check requested");

    let ready = matches!(
        state.core.store.health_check().await,
        Ok(health) if health.status == StoreStatus::Healthy
    );

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "timestamp": chrono::Utc::now(),
            "checks": {
                "store": if ready { "ready" } else { "not_ready" }
            }
        })),
    )
}

// Liveness probe
async fn liveness_check(State(state): State<HealthState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now(),
        "uptime_seconds": state.started.elapsed().as_secs()
    }))
}

fn status_label(status: &StoreStatus) -> &'static str {
    match status {
        StoreStatus::Healthy => "healthy",
        StoreStatus::Unhealthy => "unhealthy",
    }
}
