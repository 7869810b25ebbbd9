//! Article metadata as served by the index endpoint.
//!
//! `ArticleMeta` is the JSON contract consumed by the browser front end. Field
//! order is part of the output (`slug`, `title`, `description`, `date`, `url`).
//! Values are plain strings; `date` may be empty or unparsable and consumers are
//! expected to cope with that.
use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{core::frontmatter::FrontMatter, ports::article_source::DirectoryEntry};

/// File extension of article documents.
pub const ARTICLE_EXTENSION: &str = ".md";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub url: String,
}

impl ArticleMeta {
    /// Build the index entry for one document, or `None` when it is hidden.
    ///
    /// The title falls back to the file name when the header has no (or an
    /// empty) `title`; description and date default to empty strings.
    pub fn from_document(name: &str, url: &str, front_matter: &FrontMatter) -> Option<Self> {
        if front_matter.is_hidden() {
            return None;
        }

        let non_empty = |key: &str| front_matter.get(key).filter(|v| !v.is_empty());

        Some(Self {
            slug: slug_for(name).to_string(),
            title: non_empty("title").unwrap_or(name).to_string(),
            description: non_empty("description").unwrap_or_default().to_string(),
            date: non_empty("date").unwrap_or_default().to_string(),
            url: url.to_string(),
        })
    }

    /// Convenience over [`ArticleMeta::from_document`] for a listing entry.
    pub fn from_entry(entry: &DirectoryEntry, front_matter: &FrontMatter) -> Option<Self> {
        let url = entry.download_url.as_deref().unwrap_or_default();
        Self::from_document(&entry.name, url, front_matter)
    }

    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        parse_article_date(&self.date)
    }
}

/// Whether a listing entry names an article document.
pub fn is_article_file(name: &str) -> bool {
    name.ends_with(ARTICLE_EXTENSION)
}

/// Strip the article extension from a file name.
pub fn slug_for(name: &str) -> &str {
    name.strip_suffix(ARTICLE_EXTENSION).unwrap_or(name)
}

/// Parse the date formats commonly found in article headers.
///
/// Dates without a time are taken as midnight UTC, and naive date-times as UTC.
pub fn parse_article_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Total order used by the index: newest first, undated entries last.
///
/// Entries with equal (or equally missing) dates are ordered by slug so the
/// output does not depend on fetch completion order.
pub fn compare_newest_first(a: &ArticleMeta, b: &ArticleMeta) -> Ordering {
    // `None < Some(_)`, so reversing puts dated entries first, newest on top.
    Reverse(a.parsed_date())
        .cmp(&Reverse(b.parsed_date()))
        .then_with(|| a.slug.cmp(&b.slug))
}

pub fn sort_newest_first(articles: &mut [ArticleMeta]) {
    articles.sort_by(compare_newest_first);
}
