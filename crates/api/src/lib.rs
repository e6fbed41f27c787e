pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod settings;

use axum::Json;
use embedding_lab_common::ApiResponse;

pub use server::ApiServer;
pub use settings::Settings;

// Re-export common types
pub use embedding_lab_common;
pub use embedding_lab_core;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_request_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            cors_origins: vec!["*".to_string()],
            max_request_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

// Health check response
#[derive(serde::Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub uptime: u64,
    pub services: ServiceHealth,
}

#[derive(serde::Serialize)]
pub struct ServiceHealth {
    pub store: String,
    pub collection: String,
    pub vectors: Option<u64>,
}

// Common API utilities
pub fn create_success_response<T: serde::Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.max_request_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_success_response_creation() {
        let data = json!({"message": "test"});
        let response = create_success_response(data);
        assert!(response.0.success);
    }
}
