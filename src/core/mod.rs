pub mod article;
pub mod article_index;
pub mod frontmatter;
pub mod rate_limiter;
pub mod routing;

pub use article::ArticleMeta;
pub use article_index::{ArticleIndex, IndexError};
pub use rate_limiter::GovernorRateLimiter;
pub use routing::{ApiRoute, RequestTarget, RouteDecision, RoutingTable};
