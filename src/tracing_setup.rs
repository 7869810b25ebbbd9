use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::models::LoggingConfig;

/// Initialize structured logging from the logging section of the config.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .wrap_err_with(|| format!("Invalid log level: {}", config.level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if config.json {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.json().with_current_span(false).with_span_list(true))
            .try_init()
            .wrap_err("Failed to install JSON tracing subscriber")?;
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.pretty().with_ansi(true))
            .try_init()
            .wrap_err("Failed to install console tracing subscriber")?;
    }

    tracing::info!(
        level = %config.level,
        json = config.json,
        "inkgate logging initialized"
    );
    Ok(())
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, path: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.path = path,
        request.id = request_id,
        route = tracing::field::Empty,
        http.status_code = tracing::field::Empty,
    )
}

/// Create a span around one article index build
pub fn create_index_span(request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "article_index",
        request.id = request_id,
        articles = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_span() {
        let span = create_request_span("GET", "/utils/list-articles", "req-123");
        assert_eq!(span.metadata().map(|m| m.name()), Some("request"));
    }

    #[test]
    fn test_create_index_span() {
        let span = create_index_span("req-123");
        assert_eq!(span.metadata().map(|m| m.name()), Some("article_index"));
    }
}
