use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use reqwest::{Client, StatusCode, header};

use crate::{
    config::models::RepositoryConfig,
    ports::article_source::{ArticleSource, DirectoryEntry, SourceError, SourceResult},
};

const GITHUB_JSON: &str = "application/vnd.github.v3+json";

/// Article source backed by the GitHub contents API.
///
/// Responsibilities:
/// * Lists the configured articles directory at the configured branch
/// * Downloads raw documents through each entry's `download_url`
/// * Sends the descriptive `User-Agent` GitHub requires, plus the token when one is set
///
/// Every call is bounded by the client-wide timeout. There is no retry and no
/// caching: each index build hits the API again.
pub struct GitHubSource {
    client: Client,
    listing_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl GitHubSource {
    pub fn new(config: &RepositoryConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build repository API client")?;

        let token = config.token.clone().filter(|t| !t.trim().is_empty());
        if token.is_some() {
            tracing::info!("Repository API token configured");
        } else {
            tracing::warn!(
                "No repository API token configured; requests are unauthenticated and subject to stricter upstream limits"
            );
        }

        Ok(Self {
            client,
            listing_url: Self::listing_url(config),
            token,
            timeout,
        })
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{articles_path}?ref={branch}`
    pub fn listing_url(config: &RepositoryConfig) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            config.api_base.trim_end_matches('/'),
            config.owner,
            config.repo,
            config.articles_path.trim_matches('/'),
            config.branch
        )
    }

    fn map_transport_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

/// Check the listing response head before reading its body as JSON.
fn check_listing_response(
    status: StatusCode,
    content_type: &str,
    url: &str,
) -> SourceResult<()> {
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    if !content_type.contains("application/json") {
        return Err(SourceError::UnexpectedFormat {
            reason: format!("expected JSON, got content type '{content_type}'"),
        });
    }
    Ok(())
}

fn parse_listing(body: &str) -> SourceResult<Vec<DirectoryEntry>> {
    serde_json::from_str(body).map_err(|e| SourceError::UnexpectedFormat {
        reason: format!("directory listing is not a JSON array of entries: {e}"),
    })
}

#[async_trait]
impl ArticleSource for GitHubSource {
    async fn list_directory(&self) -> SourceResult<Vec<DirectoryEntry>> {
        let mut request = self
            .client
            .get(&self.listing_url)
            .header(header::ACCEPT, GITHUB_JSON);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        tracing::debug!(
            url = %self.listing_url,
            status = status.as_u16(),
            content_type = %content_type,
            "Repository listing response"
        );

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if let Err(e) = check_listing_response(status, &content_type, &self.listing_url) {
            let snippet: String = body.chars().take(200).collect();
            tracing::error!(error = %e, body = %snippet, "Repository listing rejected");
            return Err(e);
        }

        parse_listing(&body)
    }

    async fn fetch_raw(&self, entry: &DirectoryEntry) -> SourceResult<String> {
        let url = entry
            .download_url
            .as_deref()
            .ok_or_else(|| SourceError::MissingDownloadUrl {
                name: entry.name.clone(),
            })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))
    }
}
