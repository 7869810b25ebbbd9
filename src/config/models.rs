//! Configuration data structures for inkgate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and
//! to `INKGATE__`-prefixed environment variables. Every section has defaults so
//! a minimal config only needs the origin and the repository coordinates.
use serde::{Deserialize, Serialize};

use crate::core::article_index::DEFAULT_MAX_CONCURRENT_FETCHES;

/// Where the static site documents are served from.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL of the static origin, without a trailing slash
    pub base_url: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

/// Coordinates of the repository holding the articles.
#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository that holds the markdown files
    pub articles_path: String,
    /// Base URL of the contents API
    pub api_base: String,
    /// Optional access token; unauthenticated requests get stricter upstream limits
    pub token: Option<String>,
    /// Client identifier sent with every API request
    pub user_agent: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            articles_path: "articles".to_string(),
            api_base: "https://api.github.com".to_string(),
            token: None,
            user_agent: concat!("inkgate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// Hand-written so the token never ends up in logs.
impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("articles_path", &self.articles_path)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_client_ip_header() -> String {
    "CF-Connecting-IP".to_string()
}

fn default_message() -> String {
    "Too Many Requests".to_string()
}

/// Per-client rate limit applied to the API prefix.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: u64,
    pub period: String, // Parsed by humantime, e.g., "1s", "5m", "1h"
    /// Trusted header carrying the client address
    #[serde(default = "default_client_ip_header")]
    pub client_ip_header: String,
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 60,
            period: "1m".to_string(),
            client_ip_header: default_client_ip_header(),
            message: default_message(),
        }
    }
}

/// Limits applied to outbound calls.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Timeout for each outbound request, in seconds
    pub timeout_secs: u64,
    /// Maximum number of article documents fetched at once
    pub max_concurrent_fetches: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// URL layout of the site.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix of the API surface, including the trailing separator
    pub api_prefix: String,
    /// Route name of the article index under the API prefix
    pub list_articles_route: String,
    /// Extension of the documents at the origin (stripped from public URLs)
    pub document_extension: String,
    /// Name of the home document, served at `/`
    pub home_document: String,
    /// Page names reachable through clean URLs
    pub clean_pages: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/utils/".to_string(),
            list_articles_route: "list-articles".to_string(),
            document_extension: ".html".to_string(),
            home_document: "index".to_string(),
            clean_pages: vec!["about".to_string(), "blog".to_string(), "article".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            origin: OriginConfig::default(),
            repository: RepositoryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            upstream: UpstreamConfig::default(),
            routing: RoutingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    listen_addr: Option<String>,
    origin: Option<String>,
    repository: Option<RepositoryConfig>,
    token: Option<String>,
    rate_limit: Option<RateLimitConfig>,
    upstream: Option<UpstreamConfig>,
    routing: Option<RoutingConfig>,
    logging: Option<LoggingConfig>,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the static origin base URL
    pub fn origin(mut self, base_url: impl Into<String>) -> Self {
        self.origin = Some(base_url.into());
        self
    }

    /// Set the repository coordinates
    pub fn repository(
        mut self,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        self.repository = Some(RepositoryConfig {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            ..RepositoryConfig::default()
        });
        self
    }

    /// Set the repository access token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set rate limiting configuration
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Set outbound call limits
    pub fn upstream(mut self, config: UpstreamConfig) -> Self {
        self.upstream = Some(config);
        self
    }

    /// Set the URL layout
    pub fn routing(mut self, config: RoutingConfig) -> Self {
        self.routing = Some(config);
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Build the final ServerConfig
    pub fn build(self) -> Result<ServerConfig, String> {
        let listen_addr = self
            .listen_addr
            .ok_or_else(|| "listen_addr is required".to_string())?;
        let base_url = self
            .origin
            .ok_or_else(|| "origin is required".to_string())?;
        let mut repository = self
            .repository
            .ok_or_else(|| "repository is required".to_string())?;
        repository.token = self.token.or(repository.token);

        Ok(ServerConfig {
            listen_addr,
            origin: OriginConfig { base_url },
            repository,
            rate_limit: self.rate_limit.unwrap_or_default(),
            upstream: self.upstream.unwrap_or_default(),
            routing: self.routing.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        })
    }
}
