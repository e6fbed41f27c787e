use crate::{create_success_response, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use embedding_lab_common::{ApiResponse, EmbeddingData, NearestVector, StoredVector};
use embedding_lab_core::LabCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestRequest {
    pub input_vector: Vec<f32>,
    pub limit: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    /// `-1` when the store could not be queried.
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TruncateResponse {
    pub deleted: u64,
    pub message: String,
}

pub fn routes(core: Arc<LabCore>) -> Router {
    Router::new()
        .route("/", post(save_vector).delete(truncate_vectors))
        .route("/nearest", post(nearest_vectors))
        .route("/count", get(vectors_count))
        .with_state(core)
}

async fn save_vector(
    State(core): State<Arc<LabCore>>,
    payload: Result<Json<EmbeddingData>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<StoredVector>>> {
    let Json(data) = payload?;
    let stored = core.save_vector(data).await?;

    debug!("Vector {} saved to the database", stored.id);
    Ok(create_success_response(stored))
}

async fn nearest_vectors(
    State(core): State<Arc<LabCore>>,
    payload: Result<Json<NearestRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Vec<NearestVector>>>> {
    let Json(request) = payload?;
    let nearest = core
        .nearest_vectors(&request.input_vector, request.limit)
        .await?;

    Ok(create_success_response(nearest))
}

async fn vectors_count(State(core): State<Arc<LabCore>>) -> Json<ApiResponse<CountResponse>> {
    let count = match core.vectors_count().await {
        Ok(count) => count as i64,
        Err(e) => {
            error!("Failed to count vectors: {}", e);
            -1
        }
    };

    create_success_response(CountResponse { count })
}

async fn truncate_vectors(
    State(core): State<Arc<LabCore>>,
) -> ApiResult<Json<ApiResponse<TruncateResponse>>> {
    let deleted = core.truncate_vectors().await?;
    info!("Truncated {} vectors", deleted);

    Ok(create_success_response(TruncateResponse {
        deleted,
        message: "Vectors truncated from the database.".to_string(),
    }))
}
