//! In-process breadth-first crawler
//!
//! Starting from the seed, pages are fetched in BFS order and only links on
//! the seed's host (including its port) are followed. Every fetched page is
//! reported with the same-host links it contains, normalized and
//! deduplicated in document order.

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::fetcher::{
    build_http_client, same_host_links, seed_and_host, FetchError, Fetcher,
};
use crate::crawler::parser::parse_html;
use crate::ingest::CrawledPage;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Fetches a site over HTTP
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_pages: usize,
}

impl HttpFetcher {
    pub fn new(client: Client, max_pages: usize) -> Self {
        Self { client, max_pages }
    }

    /// Builds a fetcher from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        fetcher: &FetcherConfig,
    ) -> Result<Self, FetchError> {
        let client = build_http_client(user_agent, Duration::from_secs(fetcher.timeout_secs))?;
        Ok(Self::new(client, fetcher.max_pages))
    }

    /// Fetches one page and turns it into a record
    ///
    /// Non-HTML responses are recorded with their status only.
    async fn fetch_page(&self, url: &Url, host: &str) -> Result<CrawledPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        let mut page = CrawledPage::new(url.as_str());
        page.status_code = Some(status.as_u16());

        if !is_html {
            tracing::debug!("Skipping non-HTML body of {}", url);
            return Ok(page);
        }

        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        let parsed = parse_html(&body, url);
        page.title = parsed.title;
        page.canonical = parsed.canonical;
        page.description = parsed.description;
        page.internal_links = same_host_links(&parsed.links, host);

        Ok(page)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, seed: &Url) -> Result<Vec<CrawledPage>, FetchError> {
        let (seed, host) = seed_and_host(seed)?;

        let mut queue = VecDeque::from([seed.clone()]);
        let mut queued: HashSet<String> = HashSet::from([seed.to_string()]);
        let mut pages = Vec::new();

        tracing::info!(seed_url = %seed, max_pages = self.max_pages, "Starting HTTP crawl");

        while let Some(url) = queue.pop_front() {
            if pages.len() >= self.max_pages {
                tracing::info!("Reached page limit of {}", self.max_pages);
                break;
            }

            let page = match self.fetch_page(&url, &host).await {
                Ok(page) => page,
                Err(e) if url == seed => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    continue;
                }
            };

            for link in &page.internal_links {
                if queued.insert(link.clone()) {
                    if let Ok(next) = Url::parse(link) {
                        queue.push_back(next);
                    }
                }
            }

            tracing::debug!(
                status = page.status_code,
                links = page.internal_links.len(),
                "Fetched {}",
                url
            );
            pages.push(page);
        }

        tracing::info!(seed_url = %seed, pages = pages.len(), "HTTP crawl finished");
        Ok(pages)
    }
}
