//! Fetcher interface
//!
//! A fetcher turns a seed URL into the ordered page records of one crawl run.
//! Two implementations ship with the crate:
//! - [`HttpFetcher`](crate::crawler::HttpFetcher) crawls in-process with reqwest
//! - [`CommandFetcher`](crate::crawler::CommandFetcher) runs an external crawler
//!   and reads its JSON output

use crate::config::UserAgentConfig;
use crate::ingest::CrawledPage;
use crate::url::{extract_host, normalize_url};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that fail a whole fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to parse fetcher output: {0}")]
    Parse(String),

    #[error("Fetcher command {program:?} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Fetcher command is empty")]
    EmptyCommand,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces the page records of one crawl run
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Crawls from `seed` and returns the pages in fetch order
    async fn fetch(&self, seed: &Url) -> Result<Vec<CrawledPage>, FetchError>;
}

/// Normalizes the seed and returns it with the host its crawl is confined to
pub(crate) fn seed_and_host(seed: &Url) -> Result<(Url, String), FetchError> {
    let seed = normalize_url(seed.as_str())
        .map_err(|e| FetchError::Parse(format!("invalid seed {}: {}", seed, e)))?;
    let host = extract_host(&seed)
        .ok_or_else(|| FetchError::Parse(format!("seed {} has no host", seed)))?;
    Ok((seed, host))
}

/// Normalizes links, keeps the HTTP(S) ones on `host`, and drops repeats
///
/// Links that do not normalize (`mailto:`, `tel:`, `javascript:`) are
/// dropped along with links to other hosts.
pub(crate) fn same_host_links(links: &[String], host: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .iter()
        .filter_map(|link| normalize_url(link).ok())
        .filter(|url| extract_host(url).as_deref() == Some(host))
        .map(String::from)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Formats the crawler's user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `request_timeout` - Timeout for a single request
///
/// # Example
///
/// ```no_run
/// use crawl_graph::config::UserAgentConfig;
/// use crawl_graph::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "CrawlGraph".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    request_timeout: Duration,
) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(FetchError::Client)
}
