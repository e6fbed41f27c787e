use crate::ApiConfig;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// CORS middleware configuration
pub fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: AllowOrigin = if config.cors_origins.iter().any(|o| o == "*") {
        Any.into()
    } else {
        config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect::<Vec<_>>()
            .into()
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(3600))
}

// Request logging middleware
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    info!("Incoming request: {} {}", method, uri);

    let response = next.run(request).await;

    info!(
        "Request completed: {} {} - {} - {:?}",
        method,
        uri,
        response.status(),
        start.elapsed()
    );

    response
}

// Request ID middleware
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .cloned()
        .or_else(|| HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()).ok());

    if let Some(id) = &request_id {
        request
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), id.clone());
    }

    let mut response = next.run(request).await;

    if let Some(id) = request_id {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), id);
    }

    response
}

// Error handling middleware
pub async fn error_handling_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if response.status().is_server_error() {
        warn!("Server error response: {}", response.status());
    } else if response.status().is_client_error() {
        debug!("Client error response: {}", response.status());
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");
    }

    #[test]
    fn test_cors_configuration_skips_invalid_origins() {
        let config = ApiConfig {
            cors_origins: vec!["https://example.com".to_string(), "bad\norigin".to_string()],
            ..Default::default()
        };

        // Building the layer must not panic on an invalid origin.
        let _layer = cors_layer(&config);
    }
}
