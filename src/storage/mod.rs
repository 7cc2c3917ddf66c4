//! Storage module for persisting the crawl graph
//!
//! This module handles all database operations, including:
//! - SQLite initialization and schema management
//! - The domain registry
//! - The URL store (one node per normalized URL per domain)
//! - The link graph (directed internal-link edges)
//! - The crawl run log

mod domains;
mod error;
mod link_graph;
mod runs;
mod schema;
mod sqlite;
mod url_store;

pub use domains::DomainStore;
pub use error::{StorageError, StorageResult};
pub use link_graph::LinkGraph;
pub use runs::RunStore;
pub use sqlite::Database;
pub use url_store::UrlStore;

pub(crate) use domains::fetch_domain;
pub(crate) use link_graph::insert_edge;
pub(crate) use url_store::{find_foreign_url, find_url, get_url, upsert_url};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Opens a storage database at the given path
pub fn open_storage(path: &Path) -> StorageResult<Database> {
    Database::open(path)
}

/// A registered site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub id: i64,
    pub user_id: i64,
    /// Normalized site root
    pub url: String,
    /// Host of the site root, including a non-default port
    pub host: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a domain, crawled or known only as a link target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlNode {
    pub id: i64,
    pub domain_id: i64,
    /// Normalized URL, unique within the domain
    pub url: String,
    pub status_code: Option<u16>,
    pub canonical: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub last_crawled_at: Option<DateTime<Utc>>,
}

impl UrlNode {
    /// Returns true if the node was only ever seen as a link target
    pub fn is_stub(&self) -> bool {
        self.status_code.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.last_crawled_at.is_none()
    }
}

/// Page fields merged into a URL node on upsert
///
/// `None` fields never overwrite stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAttributes {
    pub status_code: Option<u16>,
    pub canonical: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub last_crawled_at: Option<DateTime<Utc>>,
}

/// A directed internal link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkEdge {
    pub source_url_id: i64,
    pub target_url_id: i64,
}

/// One crawl run of a domain
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub domain_id: i64,
    pub seed_url: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    /// When the run took the per-domain ingestion lock
    pub lock_acquired_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_ingested: Option<u32>,
    pub error_message: Option<String>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
