//! Metric names and recording helpers for the edge router.
//!
//! Everything goes through the `metrics` facade. No recorder is installed
//! here; until the embedding application registers one, calls are no-ops.
//!
//! Provided metrics:
//! * `inkgate_requests_total` (counter, labels: route, status)
//! * `inkgate_request_duration_seconds` (histogram, label: route)
//! * `inkgate_rate_limited_total` (counter)
//! * `inkgate_index_build_duration_seconds` (histogram)
//! * `inkgate_index_articles` (gauge, size of the last index built)
//! * `inkgate_article_fetch_failures_total` (counter)
//! * `inkgate_origin_requests_total` (counter, label: status, `error` on transport failure)
use std::time::{Duration, Instant};

use metrics::{
    Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::Lazy;

pub const INKGATE_REQUESTS_TOTAL: &str = "inkgate_requests_total";
pub const INKGATE_REQUEST_DURATION_SECONDS: &str = "inkgate_request_duration_seconds";
pub const INKGATE_RATE_LIMITED_TOTAL: &str = "inkgate_rate_limited_total";
pub const INKGATE_INDEX_BUILD_DURATION_SECONDS: &str = "inkgate_index_build_duration_seconds";
pub const INKGATE_INDEX_ARTICLES: &str = "inkgate_index_articles";
pub const INKGATE_ARTICLE_FETCH_FAILURES_TOTAL: &str = "inkgate_article_fetch_failures_total";
pub const INKGATE_ORIGIN_REQUESTS_TOTAL: &str = "inkgate_origin_requests_total";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        INKGATE_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests handled by the edge router."
    );
    describe_histogram!(
        INKGATE_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests handled by the edge router."
    );
    describe_counter!(
        INKGATE_RATE_LIMITED_TOTAL,
        Unit::Count,
        "API requests rejected by the rate-limit gate."
    );
    describe_histogram!(
        INKGATE_INDEX_BUILD_DURATION_SECONDS,
        Unit::Seconds,
        "Time spent listing and fetching articles for one index build."
    );
    describe_gauge!(
        INKGATE_INDEX_ARTICLES,
        "Number of visible articles in the most recent index build."
    );
    describe_counter!(
        INKGATE_ARTICLE_FETCH_FAILURES_TOTAL,
        Unit::Count,
        "Article documents dropped from an index because they failed to load."
    );
    describe_counter!(
        INKGATE_ORIGIN_REQUESTS_TOTAL,
        Unit::Count,
        "Requests forwarded to the static origin."
    );
});

/// Register metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    Lazy::force(&DESCRIPTIONS);
    tracing::info!("inkgate metrics described");
    Ok(())
}

/// Count one handled request. `route` is a low-cardinality label such as
/// `preflight`, `redirect`, `api` or `origin`, never the raw path.
pub fn increment_request_total(route: &'static str, status: u16) {
    counter!(
        INKGATE_REQUESTS_TOTAL,
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_request_duration(route: &'static str, duration: Duration) {
    histogram!(INKGATE_REQUEST_DURATION_SECONDS, "route" => route).record(duration.as_secs_f64());
}

pub fn increment_rate_limited() {
    counter!(INKGATE_RATE_LIMITED_TOTAL).increment(1);
}

pub fn record_index_build(duration: Duration, articles: usize) {
    histogram!(INKGATE_INDEX_BUILD_DURATION_SECONDS).record(duration.as_secs_f64());
    gauge!(INKGATE_INDEX_ARTICLES).set(articles as f64);
}

pub fn increment_article_fetch_failures() {
    counter!(INKGATE_ARTICLE_FETCH_FAILURES_TOTAL).increment(1);
}

/// Count an origin request; `None` marks a transport failure or timeout.
pub fn increment_origin_request(status: Option<u16>) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    counter!(INKGATE_ORIGIN_REQUESTS_TOTAL, "status" => status).increment(1);
}

/// RAII helper measuring request duration for one route label.
pub struct RequestTimer {
    start: Instant,
    route: &'static str,
}

impl RequestTimer {
    pub fn new(route: &'static str) -> Self {
        Self {
            start: Instant::now(),
            route,
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request_duration(self.route, self.start.elapsed());
    }
}
