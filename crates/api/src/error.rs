use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use embedding_lab_common::LabError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Core service error: {0}")]
    CoreService(#[from] LabError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    fn parts(self) -> (StatusCode, String, &'static str) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::CoreService(err) => match err {
                LabError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
                LabError::BinaryInput => {
                    (StatusCode::BAD_REQUEST, err.to_string(), "BINARY_INPUT")
                }
                LabError::IngestInProgress => {
                    (StatusCode::CONFLICT, err.to_string(), "INGEST_IN_PROGRESS")
                }
                LabError::MissingApiKey => {
                    (StatusCode::UNAUTHORIZED, err.to_string(), "MISSING_API_KEY")
                }
                LabError::RetriesExhausted { .. } => {
                    warn!("Upstream embedding service error: {}", err);
                    (StatusCode::BAD_GATEWAY, err.to_string(), "RETRIES_EXHAUSTED")
                }
                LabError::Embedding(_) | LabError::Generation(_) => {
                    warn!("Upstream language model error: {}", err);
                    (StatusCode::BAD_GATEWAY, err.to_string(), "UPSTREAM_ERROR")
                }
                LabError::Database(msg) => {
                    error!("Database error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Database error occurred".to_string(),
                        "DATABASE_ERROR",
                    )
                }
                LabError::Configuration(msg) | LabError::Internal(msg) => {
                    error!("Internal error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                        "INTERNAL_ERROR",
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = self.parts();

        let response_body = json!({
            "success": false,
            "error": error_message,
            "error_code": error_code,
            "timestamp": chrono::Utc::now()
        });

        (status, Json(response_body)).into_response()
    }
}

// Helper function to create validation errors
pub fn validation_error(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
