pub mod github;
pub mod http_client;
pub mod http_handler;
pub mod middleware;

/// Re-export commonly used types from adapters
pub use github::GitHubSource;
pub use http_client::HttpClientAdapter;
pub use http_handler::EdgeRouter;
pub use middleware::*;
