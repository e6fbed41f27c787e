use crate::{create_success_response, error::ApiResult, routes::ApiKey};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use embedding_lab_common::{ApiResponse, NearestVector, StoredVector};
use embedding_lab_core::LabCore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default = "default_auto_generate")]
    pub auto_generate_answer: bool,
}

fn default_auto_generate() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub prompt: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub fn routes(core: Arc<LabCore>) -> Router {
    Router::new()
        .route("/records", post(add_record))
        .route("/simulate", post(simulate))
        .with_state(core)
}

async fn add_record(
    State(core): State<Arc<LabCore>>,
    api_key: ApiKey,
    payload: Result<Json<RecordRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<StoredVector>>> {
    let Json(request) = payload?;

    let stored = core
        .add_record(
            &request.question,
            request.answer.as_deref(),
            request.auto_generate_answer,
            api_key.as_deref(),
        )
        .await?;

    Ok(create_success_response(stored))
}

async fn simulate(
    State(core): State<Arc<LabCore>>,
    api_key: ApiKey,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Vec<NearestVector>>>> {
    let Json(request) = payload?;
    debug!("Simulating prompt: {}", request.prompt);

    let nearest = core
        .simulate(&request.prompt, request.limit, api_key.as_deref())
        .await?;

    Ok(create_success_response(nearest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routes::API_KEY_HEADER,
        test_support::{body_json, test_core, test_core_without_key},
    };
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use embedding_lab_common::EmbeddingData;
    use serde_json::json;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_record_generates_answer_by_default() {
        let core = test_core().await;
        let response = routes(core.clone())
            .oneshot(post_json("/records", json!({ "question": "What is axum?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["text"], "What is axum?");
        assert_eq!(body["data"]["answer"], "Answer to: What is axum?");
        assert_eq!(core.vectors_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_record_requires_answer_without_generation() {
        let response = routes(test_core().await)
            .oneshot(post_json(
                "/records",
                json!({ "question": "Q", "autoGenerateAnswer": false }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unauthorized() {
        let response = routes(test_core_without_key().await)
            .oneshot(post_json("/simulate", json!({ "prompt": "hello" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "MISSING_API_KEY");
    }

    #[tokio::test]
    async fn test_simulate_with_header_key() {
        let core = test_core_without_key().await;
        core.save_vector(EmbeddingData::new("abcde", vec![5.0])).await.unwrap();
        core.save_vector(EmbeddingData::new("a", vec![1.0])).await.unwrap();

        let mut request = post_json("/simulate", json!({ "prompt": "abcd", "limit": 1 }));
        request
            .headers_mut()
            .insert(API_KEY_HEADER, "sk-header".parse().unwrap());

        let response = routes(core).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let nearest = body["data"].as_array().unwrap();
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0]["text"], "abcde");
        assert_eq!(nearest[0]["distance"], 1.0);
    }
}
