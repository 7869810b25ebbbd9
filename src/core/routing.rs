//! Pure request classification for the edge router.
//!
//! [`RoutingTable::route`] maps a method and request target onto exactly one
//! [`RouteDecision`]. Rules are checked in a fixed priority order:
//!
//! 1. `OPTIONS` preflight
//! 2. home document (`/index.html`, `/index`) redirects to `/`
//! 3. `*.html` redirects to the extensionless path
//! 4. trailing `/` (except root) redirects to the path without it
//! 5. the API prefix dispatches to an API route
//! 6. everything else goes to the static origin, with clean page names
//!    rewritten to their `.html` documents
//!
//! No I/O happens here; the adapter layer turns decisions into responses.
use http::Method;
use url::Url;

use crate::config::models::RoutingConfig;

/// Path, query and fragment of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl RequestTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
            fragment: None,
        }
    }

    /// Build from a request URI. HTTP request targets never carry fragments.
    pub fn from_uri(uri: &http::Uri) -> Self {
        let path = match uri.path() {
            "" => "/",
            p => p,
        };
        Self {
            path: path.to_string(),
            query: uri.query().map(str::to_string),
            fragment: None,
        }
    }

    /// Build from an absolute URL, keeping any fragment.
    pub fn from_url(url: &Url) -> Self {
        Self {
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        }
    }

    /// Same query and fragment, different path.
    ///
    /// Leading slashes and backslashes collapse to one `/` so the location
    /// can never be read as a scheme-relative URL like `//host/...`.
    fn with_path(&self, path: &str) -> String {
        let mut location = format!("/{}", path.trim_start_matches(['/', '\\']));
        if let Some(query) = &self.query {
            location.push('?');
            location.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            location.push('#');
            location.push_str(fragment);
        }
        location
    }
}

/// Routes defined under the API prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoute {
    ListArticles,
    NotFound,
}

/// What the router should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Answer a CORS preflight with an empty 204.
    Preflight,
    /// Permanent redirect to an origin-relative location.
    Redirect { location: String },
    /// Rate-limit, then serve an API route.
    Api(ApiRoute),
    /// Proxy to static origin storage at `path` (query is forwarded as-is).
    Origin { path: String },
}

/// Routing rules derived from [`RoutingConfig`].
#[derive(Debug, Clone)]
pub struct RoutingTable {
    api_prefix: String,
    list_articles_path: String,
    document_extension: String,
    home_paths: Vec<String>,
    home_document: String,
    clean_pages: Vec<String>,
}

impl RoutingTable {
    pub fn new(config: &RoutingConfig) -> Self {
        let ext = &config.document_extension;
        let api_prefix = config.api_prefix.clone();
        Self {
            list_articles_path: format!("{api_prefix}{}", config.list_articles_route),
            api_prefix,
            document_extension: ext.clone(),
            home_paths: vec![
                format!("/{}{ext}", config.home_document),
                format!("/{}", config.home_document),
            ],
            home_document: format!("/{}{ext}", config.home_document),
            clean_pages: config.clean_pages.iter().map(|p| format!("/{p}")).collect(),
        }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn route(&self, method: &Method, target: &RequestTarget) -> RouteDecision {
        let path = target.path.as_str();

        if *method == Method::OPTIONS {
            return RouteDecision::Preflight;
        }

        if self.home_paths.iter().any(|home| home == path) {
            return RouteDecision::Redirect {
                location: "/".to_string(),
            };
        }

        if let Some(stripped) = path.strip_suffix(self.document_extension.as_str()) {
            let stripped = if stripped.is_empty() { "/" } else { stripped };
            return RouteDecision::Redirect {
                location: target.with_path(stripped),
            };
        }

        if path != "/" {
            if let Some(stripped) = path.strip_suffix('/') {
                return RouteDecision::Redirect {
                    location: target.with_path(stripped),
                };
            }
        }

        if path.starts_with(&self.api_prefix) {
            let route = if path == self.list_articles_path {
                ApiRoute::ListArticles
            } else {
                ApiRoute::NotFound
            };
            return RouteDecision::Api(route);
        }

        RouteDecision::Origin {
            path: self.rewrite_clean_path(path),
        }
    }

    /// Map clean page URLs to the documents stored at the origin.
    pub fn rewrite_clean_path(&self, path: &str) -> String {
        if path == "/" {
            return self.home_document.clone();
        }
        if self.clean_pages.iter().any(|page| page == path) {
            return format!("{path}{}", self.document_extension);
        }
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        RoutingTable::new(&RoutingConfig::default())
    }

    fn get(path: &str) -> RouteDecision {
        table().route(&Method::GET, &RequestTarget::new(path))
    }

    fn redirect(location: &str) -> RouteDecision {
        RouteDecision::Redirect {
            location: location.to_string(),
        }
    }

    fn origin(path: &str) -> RouteDecision {
        RouteDecision::Origin {
            path: path.to_string(),
        }
    }

    #[test]
    fn test_preflight_wins_over_everything() {
        for path in ["/", "/index.html", "/about/", "/utils/list-articles"] {
            assert_eq!(
                table().route(&Method::OPTIONS, &RequestTarget::new(path)),
                RouteDecision::Preflight
            );
        }
    }

    #[test]
    fn test_home_document_redirects_to_root() {
        assert_eq!(get("/index.html"), redirect("/"));
        assert_eq!(get("/index"), redirect("/"));
    }

    #[test]
    fn test_extension_is_stripped() {
        assert_eq!(get("/about.html"), redirect("/about"));
        assert_eq!(get("/posts/deep.html"), redirect("/posts/deep"));
        assert_eq!(get("/.html"), redirect("/"));
    }

    #[test]
    fn test_redirect_preserves_query_and_fragment() {
        let url = Url::parse("https://site.example/about.html?ref=nav#team").unwrap();
        let target = RequestTarget::from_url(&url);
        assert_eq!(
            table().route(&Method::GET, &target),
            redirect("/about?ref=nav#team")
        );

        let url = Url::parse("https://site.example/blog/?page=2").unwrap();
        let target = RequestTarget::from_url(&url);
        assert_eq!(table().route(&Method::GET, &target), redirect("/blog?page=2"));
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        assert_eq!(get("/about/"), redirect("/about"));
        assert_eq!(get("/utils/list-articles/"), redirect("/utils/list-articles"));
        assert_eq!(get("/"), origin("/index.html"));
    }

    #[test]
    fn test_redirects_stay_on_this_host() {
        assert_eq!(get("//evil.example/"), redirect("/evil.example"));
        assert_eq!(get("//evil.example.html"), redirect("/evil.example"));
        assert_eq!(get("///evil.example/"), redirect("/evil.example"));
        assert_eq!(get("/\\evil.example.html"), redirect("/evil.example"));
        assert_eq!(get("//.html"), redirect("/"));

        let url = Url::parse("https://site.example//evil.example/?next=1").unwrap();
        let target = RequestTarget::from_url(&url);
        assert_eq!(
            table().route(&Method::GET, &target),
            redirect("/evil.example?next=1")
        );
    }

    #[test]
    fn test_api_routes() {
        assert_eq!(get("/utils/list-articles"), RouteDecision::Api(ApiRoute::ListArticles));
        assert_eq!(get("/utils/other"), RouteDecision::Api(ApiRoute::NotFound));
        assert_eq!(get("/utils/list-articles/extra"), RouteDecision::Api(ApiRoute::NotFound));
        // Without the trailing separator it is not under the prefix.
        assert_eq!(get("/utils"), origin("/utils"));
    }

    #[test]
    fn test_clean_urls_rewrite_internally() {
        assert_eq!(get("/"), origin("/index.html"));
        assert_eq!(get("/about"), origin("/about.html"));
        assert_eq!(get("/blog"), origin("/blog.html"));
        assert_eq!(get("/article"), origin("/article.html"));
    }

    #[test]
    fn test_other_paths_pass_through() {
        assert_eq!(get("/assets/js/app.js"), origin("/assets/js/app.js"));
        assert_eq!(get("/contact"), origin("/contact"));
        assert_eq!(get("/about/team"), origin("/about/team"));
    }

    #[test]
    fn test_rewritten_target_is_never_redirected() {
        // `/about` rewrites to `/about.html` for the origin, while a client
        // asking for `/about.html` is sent back to `/about`.
        let table = table();
        let rewritten = table.rewrite_clean_path("/about");
        assert_eq!(rewritten, "/about.html");
        assert_eq!(get("/about"), origin("/about.html"));
        assert_eq!(get("/about.html"), redirect("/about"));
    }

    #[test]
    fn test_from_uri() {
        let uri: http::Uri = "/about.html?x=1".parse().unwrap();
        let target = RequestTarget::from_uri(&uri);
        assert_eq!(target.path, "/about.html");
        assert_eq!(target.query.as_deref(), Some("x=1"));
        assert_eq!(target.fragment, None);
    }

    #[test]
    fn test_custom_routing_config() {
        let config = RoutingConfig {
            api_prefix: "/api/".to_string(),
            clean_pages: vec!["projects".to_string()],
            ..RoutingConfig::default()
        };
        let table = RoutingTable::new(&config);
        assert_eq!(
            table.route(&Method::GET, &RequestTarget::new("/api/list-articles")),
            RouteDecision::Api(ApiRoute::ListArticles)
        );
        assert_eq!(
            table.route(&Method::GET, &RequestTarget::new("/projects")),
            origin("/projects.html")
        );
        assert_eq!(
            table.route(&Method::GET, &RequestTarget::new("/about")),
            origin("/about")
        );
    }
}
