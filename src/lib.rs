//! inkgate - an edge router and article index for a static markdown blog.
//!
//! inkgate sits in front of static site storage. It answers CORS preflights,
//! redirects `*.html` and trailing-slash URLs to their clean form, rewrites
//! clean page URLs back to the stored documents, and serves one dynamic
//! endpoint: a JSON index of the articles kept as markdown files in a GitHub
//! repository, built from each file's front-matter header.
//!
//! # Quick Example
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use inkgate::{EdgeRouter, GitHubSource, GovernorRateLimiter, HttpClientAdapter};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg = inkgate::config::loader::load_config("config.toml").await?;
//! let timeout = Duration::from_secs(cfg.upstream.timeout_secs);
//! let router = EdgeRouter::new(
//!     &cfg,
//!     Arc::new(GitHubSource::new(&cfg.repository, timeout)?),
//!     Arc::new(HttpClientAdapter::new(timeout)?),
//!     Arc::new(GovernorRateLimiter::new(&cfg.rate_limit)?),
//! )?;
//! # let _ = router;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Pure logic (front matter, routing, sorting, index building) lives in `core`.
//! The three outside collaborators (article repository, static origin,
//! rate limiter) are traits in `ports` with implementations in `adapters`,
//! so tests can swap any of them for an in-memory fake.
//!
//! # Error Handling
//! Application-level APIs return `eyre::Result<T>`; domain failures use
//! `thiserror` enums. Request handling never fails: every error becomes a
//! response with a matching status.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{EdgeRouter, GitHubSource, HttpClientAdapter},
    core::{ArticleIndex, ArticleMeta, GovernorRateLimiter},
    ports::{article_source::ArticleSource, http_client::HttpClient, rate_limit::RateLimitService},
    utils::GracefulShutdown,
};
