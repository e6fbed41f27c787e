use crate::{
    create_success_response,
    error::{validation_error, ApiError, ApiResult},
    routes::ApiKey,
};
use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use embedding_lab_common::{ApiResponse, IngestProgress, IngestReport, LabError};
use embedding_lab_core::LabCore;
use std::sync::Arc;
use tracing::{debug, info};

pub const UPLOAD_FIELD: &str = "file";

pub fn routes(core: Arc<LabCore>) -> Router {
    Router::new()
        .route("/", post(ingest_text))
        .route("/upload", post(ingest_upload))
        .route("/progress", get(ingest_progress))
        .with_state(core)
}

/// Imports a CSV document sent as the raw request body.
async fn ingest_text(
    State(core): State<Arc<LabCore>>,
    api_key: ApiKey,
    body: String,
) -> ApiResult<Json<ApiResponse<IngestReport>>> {
    debug!("Ingesting {} bytes of text", body.len());
    let report = core.ingest_csv(&body, api_key.as_deref()).await?;
    Ok(create_success_response(report))
}

/// Imports the CSV document attached as the `file` multipart field.
async fn ingest_upload(
    State(core): State<Arc<LabCore>>,
    api_key: ApiKey,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<IngestReport>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        // Non UTF-8 uploads are treated the same as control-character content.
        let content =
            String::from_utf8(bytes.to_vec()).map_err(|_| ApiError::from(LabError::BinaryInput))?;

        info!("Ingesting uploaded file {} ({} bytes)", file_name, content.len());
        let report = core.ingest_csv(&content, api_key.as_deref()).await?;
        return Ok(create_success_response(report));
    }

    Err(validation_error("Missing 'file' field in upload"))
}

async fn ingest_progress(State(core): State<Arc<LabCore>>) -> Json<ApiResponse<IngestProgress>> {
    create_success_response(core.ingest_progress())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, test_core};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "lab-boundary";

    fn multipart_request(field: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"data.csv\"\r\nContent-Type: text/csv\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_text_body() {
        let core = test_core().await;
        let response = routes(core.clone())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .body(Body::from("What?,That\nnot a record\nWho?,\n"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_lines"], 4);
        assert_eq!(body["data"]["imported"], 2);
        assert_eq!(body["data"]["generated_answers"], 1);
        assert_eq!(core.vectors_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_upload() {
        let core = test_core().await;
        let response = routes(core.clone())
            .oneshot(multipart_request("file", b"Q1?,A1\nQ2?,A2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["imported"], 2);
        assert_eq!(core.ingest_progress().percent, 100);
    }

    #[tokio::test]
    async fn test_ingest_upload_rejects_binary() {
        let response = routes(test_core().await)
            .oneshot(multipart_request("file", &[0xff, 0xfe, 0x00, 0x01]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "BINARY_INPUT");
    }

    #[tokio::test]
    async fn test_ingest_upload_requires_file_field() {
        let response = routes(test_core().await)
            .oneshot(multipart_request("attachment", b"Q?,A"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_progress_starts_idle() {
        let response = routes(test_core().await)
            .oneshot(Request::builder().uri("/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["step"], "idle");
        assert_eq!(body["data"]["percent"], 0);
    }
}
