//! Ingestion module
//!
//! This module turns one crawl run's page records into a consistent update of
//! the URL store and the link graph.

mod pipeline;
mod record;

pub use pipeline::{BatchSummary, IngestionPipeline};
pub use record::CrawledPage;

use crate::storage::StorageError;
use crate::UrlError;
use thiserror::Error;

/// Errors that abort an ingestion batch
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(
        "Link {source_url} -> {target_url} crosses domains ({source_domain_id} -> {target_domain_id})"
    )]
    CrossDomainLink {
        source_url: String,
        target_url: String,
        source_domain_id: i64,
        target_domain_id: i64,
    },

    #[error("Invalid URL {url:?} in crawl batch: {source}")]
    InvalidUrl { url: String, source: UrlError },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
