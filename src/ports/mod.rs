pub mod article_source;
pub mod http_client;
pub mod rate_limit;
