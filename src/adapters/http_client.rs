use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    metrics,
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};

/// HTTP client adapter for the static origin, using Hyper with Rustls.
///
/// Responsibilities:
/// * Points the `Host` header at the origin rather than the edge hostname
/// * Forces request version to HTTP/1.1 while allowing ALPN to negotiate h2
/// * Bounds every request with a timeout
/// * Converts between Hyper body and Axum body types
///
/// Responses are streamed back untouched apart from `Transfer-Encoding`,
/// which the serving side re-frames.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
    timeout: Duration,
}

impl HttpClientAdapter {
    /// Create a new origin client with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        for cert in native_certs.certs {
            if root_cert_store.add(cert).is_err() {
                tracing::warn!("Failed to add native certificate to rustls RootCertStore");
            }
        }
        tracing::info!("Loaded {} native root certificates.", root_cert_store.len());

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        Ok(Self {
            client,
            timeout: request_timeout,
        })
    }

    /// Replace the inbound `Host` with the origin authority taken from the URI.
    fn set_origin_host(req: &mut Request<AxumBody>) -> HttpClientResult<()> {
        let uri = req.uri();
        let host = uri.host().ok_or_else(|| {
            HttpClientError::InvalidRequest(format!("Outgoing URI has no host: {uri}"))
        })?;
        let value = match uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let value = HeaderValue::from_str(&value)
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;
        req.headers_mut().insert(header::HOST, value);
        Ok(())
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
    ) -> HttpClientResult<Response<AxumBody>> {
        Self::set_origin_host(&mut req)?;

        let (mut parts, body) = req.into_parts();
        parts.version = Version::HTTP_11;

        let span = tracing::info_span!(
            "origin_request",
            http.method = %parts.method,
            http.url = %parts.uri,
            http.status_code = tracing::field::Empty,
        );
        tracing::debug!(parent: &span, "Outgoing request headers: {:?}", parts.headers);

        let method = parts.method.clone();
        let uri = parts.uri.clone();
        let outgoing_request = Request::from_parts(parts, body);

        let in_flight = timeout(self.timeout, self.client.request(outgoing_request));
        let response = match in_flight.instrument(span.clone()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!("Error making request to origin ({} {}): {}", method, uri, e);
                metrics::increment_origin_request(None);
                return Err(HttpClientError::ConnectionError(format!(
                    "Request to {method} {uri} failed: {e}"
                )));
            }
            Err(_) => {
                tracing::error!("Origin request timed out ({} {})", method, uri);
                metrics::increment_origin_request(None);
                return Err(HttpClientError::Timeout(self.timeout.as_secs()));
            }
        };

        let status = response.status().as_u16();
        span.record("http.status_code", status);
        metrics::increment_origin_request(Some(status));

        let (mut parts, hyper_body) = response.into_parts();
        parts.headers.remove(header::TRANSFER_ENCODING);

        Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HttpClientAdapter::new(Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_set_origin_host() {
        let mut req = Request::builder()
            .uri("https://pages.example:8443/about.html")
            .header(header::HOST, "site.example")
            .body(AxumBody::empty())
            .unwrap();

        HttpClientAdapter::set_origin_host(&mut req).unwrap();
        assert_eq!(
            req.headers().get(header::HOST).unwrap(),
            HeaderValue::from_static("pages.example:8443")
        );
    }

    #[test]
    fn test_relative_uri_is_rejected() {
        let mut req = Request::builder()
            .uri("/about.html")
            .body(AxumBody::empty())
            .unwrap();

        assert!(matches!(
            HttpClientAdapter::set_origin_host(&mut req),
            Err(HttpClientError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_origin() {
        let client = HttpClientAdapter::new(Duration::from_secs(2)).unwrap();
        let req = Request::builder()
            .uri("http://127.0.0.1:1/index.html")
            .body(AxumBody::empty())
            .unwrap();

        let result = client.send_request(req).await;
        assert!(matches!(
            result,
            Err(HttpClientError::ConnectionError(_)) | Err(HttpClientError::Timeout(_))
        ));
    }
}
