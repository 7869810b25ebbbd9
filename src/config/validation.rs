use std::net::SocketAddr;

use url::Url;

use crate::{
    config::models::{
        OriginConfig, RateLimitConfig, RepositoryConfig, RoutingConfig, ServerConfig,
        UpstreamConfig,
    },
    core::rate_limiter::quota_for,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration, reporting every problem at once
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }
        errors.extend(Self::validate_origin(&config.origin));
        errors.extend(Self::validate_repository(&config.repository));
        errors.extend(Self::validate_rate_limit(&config.rate_limit));
        errors.extend(Self::validate_upstream(&config.upstream));
        errors.extend(Self::validate_routing(&config.routing));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_http_url(value: &str, field: &str) -> Option<ValidationError> {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => None,
            Ok(_) => Some(ValidationError::InvalidField {
                field: field.to_string(),
                message: "URL must use http:// or https:// and name a host".to_string(),
            }),
            Err(e) => Some(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("Invalid URL '{value}': {e}"),
            }),
        }
    }

    fn validate_origin(origin: &OriginConfig) -> Vec<ValidationError> {
        let mut errors: Vec<_> = Self::validate_http_url(&origin.base_url, "origin.base_url")
            .into_iter()
            .collect();
        if origin.base_url.ends_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "origin.base_url".to_string(),
                message: "Must not end with '/'".to_string(),
            });
        }
        errors
    }

    fn validate_repository(repository: &RepositoryConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("repository.owner", &repository.owner),
            ("repository.repo", &repository.repo),
            ("repository.branch", &repository.branch),
            ("repository.articles_path", &repository.articles_path),
            ("repository.user_agent", &repository.user_agent),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        errors.extend(Self::validate_http_url(
            &repository.api_base,
            "repository.api_base",
        ));
        errors
    }

    fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = quota_for(rate_limit) {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit".to_string(),
                message: e.to_string(),
            });
        }

        if http::HeaderName::from_bytes(rate_limit.client_ip_header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.client_ip_header".to_string(),
                message: format!("'{}' is not a valid header name", rate_limit.client_ip_header),
            });
        }

        errors
    }

    fn validate_upstream(upstream: &UpstreamConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if upstream.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream.timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }
        if upstream.max_concurrent_fetches == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream.max_concurrent_fetches".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }
        errors
    }

    fn validate_routing(routing: &RoutingConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(routing.api_prefix.starts_with('/') && routing.api_prefix.ends_with('/'))
            || routing.api_prefix == "/"
        {
            errors.push(ValidationError::InvalidField {
                field: "routing.api_prefix".to_string(),
                message: "Must start and end with '/' and not be the root".to_string(),
            });
        }

        if !routing.document_extension.starts_with('.') || routing.document_extension.len() < 2 {
            errors.push(ValidationError::InvalidField {
                field: "routing.document_extension".to_string(),
                message: "Must look like '.html'".to_string(),
            });
        }

        for page in routing
            .clean_pages
            .iter()
            .chain(std::iter::once(&routing.home_document))
            .chain(std::iter::once(&routing.list_articles_route))
        {
            if page.is_empty() || page.contains('/') {
                errors.push(ValidationError::InvalidField {
                    field: "routing".to_string(),
                    message: format!("'{page}' must be a single non-empty path segment"),
                });
            }
        }

        errors
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(|e| format!("  • {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
