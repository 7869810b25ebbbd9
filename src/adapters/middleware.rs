//! Axum middleware attached around the edge router.
//!
//! Both layers are stateless; they only decorate the request or response.
use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;

/// Header carrying the per-request id, inbound and outbound.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log start/end of a request including latency.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    tracing::debug!("Started processing {} {}", method, uri);

    let response = next.run(req).await;

    tracing::info!(
        "Completed {} {} - {} in {:?}",
        method,
        uri,
        response.status(),
        start.elapsed()
    );

    response
}

/// Ensure every request has an id and echo it back as `x-request-id`.
///
/// An id supplied by an upstream proxy is kept; otherwise a UUID v4 is made.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = match req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(id) => id.to_string(),
        None => uuid::Uuid::new_v4().to_string(),
    };

    let header_value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header_value {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let span = tracing::debug_span!("request_id", request_id = %request_id);
    let mut response = next.run(req).instrument(span).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt; // for oneshot

    use super::*;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|req: Request| async move {
                    // Echo what the handler saw so the test can compare.
                    let seen = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .cloned()
                        .unwrap_or(HeaderValue::from_static("none"));
                    axum::response::Response::builder()
                        .status(StatusCode::OK)
                        .header("x-seen-request-id", seen)
                        .body(Body::empty())
                        .unwrap()
                }),
            )
            .layer(middleware::from_fn(request_id_middleware))
            .layer(middleware::from_fn(request_timing_middleware))
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();

        let request_id = headers.get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(request_id).is_ok());
        assert_eq!(headers.get("x-seen-request-id").unwrap(), request_id);
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "edge-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "edge-42");
        assert_eq!(response.headers().get("x-seen-request-id").unwrap(), "edge-42");
    }
}
