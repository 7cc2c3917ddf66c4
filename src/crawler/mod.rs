//! Crawler module
//!
//! This module contains everything between a crawl request and a committed
//! graph update:
//! - The [`Fetcher`] interface and its HTTP and subprocess implementations
//! - HTML parsing for page metadata and links
//! - Per-domain ingestion locks
//! - The crawl coordinator

mod command;
mod coordinator;
mod fetcher;
mod http;
mod locks;
mod parser;

pub use command::CommandFetcher;
pub use coordinator::{CrawlCoordinator, CrawlError};
pub use fetcher::{build_http_client, user_agent_string, FetchError, Fetcher};
pub use http::HttpFetcher;
pub use locks::DomainLocks;
pub use parser::{parse_html, ParsedPage};

use crate::config::{FetcherConfig, FetcherKind, UserAgentConfig};
use std::sync::Arc;

/// Builds the fetcher selected by configuration
pub fn build_fetcher(
    user_agent: &UserAgentConfig,
    config: &FetcherConfig,
) -> Result<Arc<dyn Fetcher>, FetchError> {
    match config.kind {
        FetcherKind::Http => Ok(Arc::new(HttpFetcher::from_config(user_agent, config)?)),
        FetcherKind::Command => Ok(Arc::new(CommandFetcher::new(&config.command)?)),
    }
}
