use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while talking to the article repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceError {
    /// The remote answered with a non-success status
    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The remote answered successfully but not with what we asked for
    #[error("unexpected response format: {reason}")]
    UnexpectedFormat { reason: String },

    /// The request never completed
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// A listing entry that cannot be downloaded directly
    #[error("no download location for {name}")]
    MissingDownloadUrl { name: String },
}

/// Result alias for repository operations
pub type SourceResult<T> = Result<T, SourceError>;

/// One entry of a repository directory listing.
///
/// Only the fields the index needs are kept; anything else the remote sends
/// is ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

fn default_entry_kind() -> String {
    "file".to_string()
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_entry_kind(),
            download_url: Some(download_url.into()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// ArticleSource defines the port for reading articles from a remote repository
#[async_trait]
pub trait ArticleSource: Send + Sync + 'static {
    /// List the entries of the articles directory
    ///
    /// # Returns
    /// Every entry the remote reports, articles or not. Failure here fails
    /// the whole index build.
    async fn list_directory(&self) -> SourceResult<Vec<DirectoryEntry>>;

    /// Fetch the raw text of one listed entry
    ///
    /// # Arguments
    /// * `entry` - An entry previously returned by `list_directory`
    async fn fetch_raw(&self, entry: &DirectoryEntry) -> SourceResult<String>;
}
