pub mod health;
pub mod ingest;
pub mod records;
pub mod vectors;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, Router};
use embedding_lab_core::LabCore;
use std::{convert::Infallible, sync::Arc};

pub const API_KEY_HEADER: &str = "x-api-key";

pub fn create_routes(core: Arc<LabCore>) -> Router {
    Router::new()
        // Health check routes
        .nest("/health", health::routes(core.clone()))
        .nest("/api/v1", api_routes(core))
}

fn api_routes(core: Arc<LabCore>) -> Router {
    Router::new()
        // Raw vector storage and lookup
        .nest("/vectors", vectors::routes(core.clone()))
        // Embedding-backed operations
        .merge(records::routes(core.clone()))
        // File import
        .nest("/ingest", ingest::routes(core))
}

// Fallback handler for unmatched routes
pub async fn not_found_handler() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}

/// Optional per-request language-model credential from the `x-api-key` header.
#[derive(Debug, Clone, Default)]
pub struct ApiKey(pub Option<String>);

impl ApiKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(ApiKey(key))
    }
}
