use std::sync::Arc;

use axum::{
    body::Body as AxumBody,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, header},
    response::IntoResponse,
};
use eyre::{Result, WrapErr};
use hyper::{Request, Response};
use tracing::Instrument;

use crate::{
    adapters::middleware::REQUEST_ID_HEADER,
    config::models::ServerConfig,
    core::{ApiRoute, ArticleIndex, RequestTarget, RouteDecision, RoutingTable},
    metrics::{self, RequestTimer},
    ports::{article_source::ArticleSource, http_client::HttpClient, rate_limit::RateLimitService},
    tracing_setup::{create_index_span, create_request_span},
};

/// Key used when the client address header is missing or unreadable.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Edge router sitting in front of the static site.
///
/// Every request gets exactly one response: preflights and clean-URL
/// redirects are answered directly, `/utils/*` goes through the rate-limit
/// gate to the API routes, and everything else is proxied to the origin.
#[derive(Clone)]
pub struct EdgeRouter {
    routing: RoutingTable,
    index: ArticleIndex,
    origin_client: Arc<dyn HttpClient>,
    rate_limiter: Arc<dyn RateLimitService>,
    origin_base: String,
    client_ip_header: HeaderName,
    rate_limit_message: String,
}

impl EdgeRouter {
    pub fn new(
        config: &ServerConfig,
        source: Arc<dyn ArticleSource>,
        origin_client: Arc<dyn HttpClient>,
        rate_limiter: Arc<dyn RateLimitService>,
    ) -> Result<Self> {
        let client_ip_header =
            HeaderName::from_bytes(config.rate_limit.client_ip_header.as_bytes())
                .wrap_err_with(|| {
                    format!(
                        "Invalid client IP header name: {}",
                        config.rate_limit.client_ip_header
                    )
                })?;

        Ok(Self {
            routing: RoutingTable::new(&config.routing),
            index: ArticleIndex::new(source, config.upstream.max_concurrent_fetches),
            origin_client,
            rate_limiter,
            origin_base: config.origin.base_url.trim_end_matches('/').to_string(),
            client_ip_header,
            rate_limit_message: config.rate_limit.message.clone(),
        })
    }

    /// Route one request and produce its response.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let target = RequestTarget::from_uri(req.uri());
        let decision = self.routing.route(req.method(), &target);
        let route = route_label(&decision);
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let span = create_request_span(req.method().as_str(), &target.path, &request_id);
        span.record("route", route);
        let _timer = RequestTimer::new(route);

        let response = async {
            match decision {
                RouteDecision::Preflight => {
                    with_cors(StatusCode::NO_CONTENT.into_response())
                }
                RouteDecision::Redirect { location } => {
                    tracing::debug!(location = %location, "Redirecting to clean URL");
                    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)])
                        .into_response()
                }
                RouteDecision::Api(api_route) => {
                    self.handle_api(api_route, req.headers(), &request_id).await
                }
                RouteDecision::Origin { path } => {
                    self.forward_to_origin(req, &path, target.query.as_deref())
                        .await
                }
            }
        }
        .instrument(span.clone())
        .await;

        let status = response.status().as_u16();
        span.record("http.status_code", status);
        metrics::increment_request_total(route, status);
        response
    }

    /// Rate-limit gate first, then the API route.
    async fn handle_api(
        &self,
        route: ApiRoute,
        headers: &HeaderMap,
        request_id: &str,
    ) -> Response<AxumBody> {
        let client = self.client_key(headers);
        if !self.rate_limiter.limit(&client).await.is_allowed() {
            tracing::warn!(client = %client, "Rate limit exceeded");
            metrics::increment_rate_limited();
            return with_cors(
                (StatusCode::TOO_MANY_REQUESTS, self.rate_limit_message.clone()).into_response(),
            );
        }

        let response = match route {
            ApiRoute::ListArticles => self.list_articles(request_id).await,
            ApiRoute::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        };
        with_cors(response)
    }

    async fn list_articles(&self, request_id: &str) -> Response<AxumBody> {
        let span = create_index_span(request_id);
        let built = self.index.build().instrument(span.clone()).await;

        let articles = match built {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build article index");
                return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            }
        };
        span.record("articles", articles.len());

        match serde_json::to_string_pretty(&articles) {
            Ok(json) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize article index");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }

    /// Proxy to the origin at `path`, keeping method, headers, body and query.
    async fn forward_to_origin(
        &self,
        req: Request<AxumBody>,
        path: &str,
        query: Option<&str>,
    ) -> Response<AxumBody> {
        let uri = match self.origin_uri(path, query) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, path, "Failed to build origin URI");
                return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
            }
        };

        let (mut parts, body) = req.into_parts();
        parts.uri = uri;
        let outgoing = Request::from_parts(parts, body);

        match self.origin_client.send_request(outgoing).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, path, "Origin request failed");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }

    fn origin_uri(&self, path: &str, query: Option<&str>) -> Result<Uri> {
        let uri = match query {
            Some(query) => format!("{}{path}?{query}", self.origin_base),
            None => format!("{}{path}", self.origin_base),
        };
        uri.parse::<Uri>()
            .wrap_err_with(|| format!("Invalid origin URI: {uri}"))
    }

    /// Rate-limit key for the caller.
    fn client_key(&self, headers: &HeaderMap) -> String {
        headers
            .get(&self.client_ip_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string()
    }
}

/// Attach the permissive cross-origin headers used by the API and preflights.
pub fn with_cors(mut response: Response<AxumBody>) -> Response<AxumBody> {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}

fn route_label(decision: &RouteDecision) -> &'static str {
    match decision {
        RouteDecision::Preflight => "preflight",
        RouteDecision::Redirect { .. } => "redirect",
        RouteDecision::Api(_) => "api",
        RouteDecision::Origin { .. } => "origin",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::ports::{
        article_source::{DirectoryEntry, SourceResult},
        http_client::{HttpClientError, HttpClientResult},
        rate_limit::RateLimitDecision,
    };

    struct EmptySource;

    #[async_trait]
    impl ArticleSource for EmptySource {
        async fn list_directory(&self) -> SourceResult<Vec<DirectoryEntry>> {
            Ok(Vec::new())
        }

        async fn fetch_raw(&self, _entry: &DirectoryEntry) -> SourceResult<String> {
            Ok(String::new())
        }
    }

    struct DownOrigin;

    #[async_trait]
    impl HttpClient for DownOrigin {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            Err(HttpClientError::ConnectionError("refused".into()))
        }
    }

    struct AllowAll;

    #[async_trait]
    impl RateLimitService for AllowAll {
        async fn limit(&self, _key: &str) -> RateLimitDecision {
            RateLimitDecision::Allow
        }
    }

    fn router() -> EdgeRouter {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:0")
            .origin("https://pages.example/")
            .repository("someone", "site", "main")
            .build()
            .unwrap();
        EdgeRouter::new(
            &config,
            Arc::new(EmptySource),
            Arc::new(DownOrigin),
            Arc::new(AllowAll),
        )
        .unwrap()
    }

    #[test]
    fn test_origin_uri() {
        let router = router();
        assert_eq!(
            router.origin_uri("/about.html", None).unwrap(),
            "https://pages.example/about.html"
        );
        assert_eq!(
            router.origin_uri("/app.js", Some("v=2")).unwrap(),
            "https://pages.example/app.js?v=2"
        );
    }

    #[test]
    fn test_client_key() {
        let router = router();
        let mut headers = HeaderMap::new();
        assert_eq!(router.client_key(&headers), UNKNOWN_CLIENT);

        headers.insert("cf-connecting-ip", HeaderValue::from_static(" 203.0.113.9 "));
        assert_eq!(router.client_key(&headers), "203.0.113.9");

        headers.insert("cf-connecting-ip", HeaderValue::from_static(""));
        assert_eq!(router.client_key(&headers), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_invalid_client_header_is_rejected() {
        let mut config = ServerConfig::builder()
            .listen_addr("127.0.0.1:0")
            .origin("https://pages.example")
            .repository("someone", "site", "main")
            .build()
            .unwrap();
        config.rate_limit.client_ip_header = "not a header".to_string();
        assert!(
            EdgeRouter::new(
                &config,
                Arc::new(EmptySource),
                Arc::new(DownOrigin),
                Arc::new(AllowAll),
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_origin_failure_is_bad_gateway() {
        let req = Request::builder()
            .uri("/about")
            .body(AxumBody::empty())
            .unwrap();
        let response = router().handle_request(req).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_empty_index_is_empty_array() {
        let req = Request::builder()
            .uri("/utils/list-articles")
            .body(AxumBody::empty())
            .unwrap();
        let response = router().handle_request(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"[]");
    }
}
