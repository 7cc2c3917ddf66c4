//! crawl-graph: crawl metadata and internal link graph service
//!
//! This crate turns the output of a site crawl into a durable directed graph
//! of URL nodes and internal-link edges, keyed per registered domain.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod ingest;
pub mod output;
pub mod service;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl-graph operations
#[derive(Debug, Error)]
pub enum CrawlGraphError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] auth::AuthError),

    #[error("User {user_id} does not own domain {domain_id}")]
    Forbidden { user_id: i64, domain_id: i64 },

    #[error(transparent)]
    Crawl(#[from] crawler::CrawlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlGraphError {
    /// Status code a request layer should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Url(_) | Self::Storage(storage::StorageError::InvalidUrl(_)) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden { .. } => 403,
            Self::Storage(e) if e.is_not_found() => 404,
            Self::Crawl(e) => e.status_code(),
            _ => 500,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for crawl-graph operations
pub type Result<T> = std::result::Result<T, CrawlGraphError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{CrawledPage, IngestionPipeline};
pub use service::CrawlService;
pub use storage::{Database, Domain, LinkGraph, UrlNode, UrlStore};
pub use url::{extract_host, normalize_url};
