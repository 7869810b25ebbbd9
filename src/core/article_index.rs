//! Builds the article index served at `/utils/list-articles`.
//!
//! Every build lists the articles directory, fetches each markdown document,
//! reads its front matter and returns the visible entries newest first.
//! Nothing is cached between builds.
//!
//! Failure isolation differs by stage: the directory listing is all or
//! nothing, while a document that fails to download is logged and left out.
use std::{sync::Arc, time::Instant};

use futures_util::{StreamExt, stream};
use thiserror::Error;

use crate::{
    core::{
        article::{ArticleMeta, is_article_file, sort_newest_first},
        frontmatter::{self, ExtractOutcome},
    },
    metrics,
    ports::article_source::{ArticleSource, DirectoryEntry, SourceError},
};

/// Default number of documents fetched at the same time.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Reasons an index build fails as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Repository API error: {status}")]
    UpstreamStatus { status: u16 },

    #[error("Unexpected response format: {reason}")]
    UnexpectedFormat { reason: String },

    #[error("Index error: {0}")]
    Source(SourceError),
}

impl From<SourceError> for IndexError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Status { status, .. } => IndexError::UpstreamStatus { status },
            SourceError::UnexpectedFormat { reason } => IndexError::UnexpectedFormat { reason },
            other => IndexError::Source(other),
        }
    }
}

/// Article index builder over an [`ArticleSource`].
#[derive(Clone)]
pub struct ArticleIndex {
    source: Arc<dyn ArticleSource>,
    max_concurrent_fetches: usize,
}

impl ArticleIndex {
    pub fn new(source: Arc<dyn ArticleSource>, max_concurrent_fetches: usize) -> Self {
        Self {
            source,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// List, fetch, filter and sort the visible articles.
    pub async fn build(&self) -> Result<Vec<ArticleMeta>, IndexError> {
        let started = Instant::now();

        let entries = self.source.list_directory().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list articles directory");
            IndexError::from(e)
        })?;

        let candidates: Vec<DirectoryEntry> = entries
            .into_iter()
            .filter(|entry| entry.is_file() && is_article_file(&entry.name))
            .collect();

        tracing::debug!(
            count = candidates.len(),
            concurrency = self.max_concurrent_fetches,
            "Fetching article documents"
        );

        let mut articles: Vec<ArticleMeta> = stream::iter(candidates)
            .map(|entry| self.load_entry(entry))
            .buffer_unordered(self.max_concurrent_fetches)
            .filter_map(|article| async move { article })
            .collect()
            .await;

        sort_newest_first(&mut articles);

        metrics::record_index_build(started.elapsed(), articles.len());
        tracing::info!(
            articles = articles.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Article index built"
        );

        Ok(articles)
    }

    /// Fetch one document and turn it into an index entry.
    ///
    /// Returns `None` for hidden documents and for any fetch failure.
    async fn load_entry(&self, entry: DirectoryEntry) -> Option<ArticleMeta> {
        let raw = match self.source.fetch_raw(&entry).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "Skipping article that failed to load");
                metrics::increment_article_fetch_failures();
                return None;
            }
        };

        let extraction = frontmatter::extract(&raw);
        if extraction.outcome == ExtractOutcome::Unterminated {
            tracing::warn!(file = %entry.name, "Article has an unterminated front-matter block");
        }

        let article = ArticleMeta::from_entry(&entry, &extraction.metadata);
        if article.is_none() {
            tracing::debug!(file = %entry.name, "Article is hidden");
        }
        article
    }
}
