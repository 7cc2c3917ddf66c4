//! Page records handed from a fetcher to the ingestion pipeline

use crate::storage::PageAttributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One crawled page as reported by a fetcher
///
/// The JSON form uses snake_case keys:
///
/// ```json
/// {"url": "https://a.com/", "title": "Home", "status_code": 200,
///  "canonical": null, "description": "", "internal_links": ["https://a.com/b"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub canonical: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Links the fetcher classified as internal to the crawled site
    #[serde(default)]
    pub internal_links: Vec<String>,
}

impl CrawledPage {
    /// Creates a record for `url` with no metadata and no links
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Adds internal links to the record
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal_links.extend(links.into_iter().map(Into::into));
        self
    }

    /// The attributes this record contributes to its URL node
    ///
    /// Empty strings count as absent.
    pub fn attributes(&self, crawled_at: DateTime<Utc>) -> PageAttributes {
        PageAttributes {
            status_code: self.status_code,
            canonical: non_empty(&self.canonical),
            title: non_empty(&self.title),
            description: non_empty(&self.description),
            last_crawled_at: Some(crawled_at),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
