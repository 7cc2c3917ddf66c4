//! URL store: one node per normalized URL per domain

use crate::storage::{fetch_domain, Database, PageAttributes, StorageError, StorageResult, UrlNode};
use crate::url::normalize_url;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const URL_COLUMNS: &str =
    "url_id, domain_id, url, status_code, canonical, title, description, last_crawled_at";

pub(crate) fn map_url_node(row: &Row<'_>) -> rusqlite::Result<UrlNode> {
    Ok(UrlNode {
        id: row.get(0)?,
        domain_id: row.get(1)?,
        url: row.get(2)?,
        status_code: row.get(3)?,
        canonical: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        last_crawled_at: row.get(7)?,
    })
}

/// Inserts or merges a URL node keyed by (domain, normalized URL)
///
/// The lookup, insert and merge happen in one statement, so a key can only
/// ever be created once. Non-null attributes overwrite stored values; null
/// attributes leave them untouched, which lets a stub be enriched later.
pub(crate) fn upsert_url(
    conn: &Connection,
    domain_id: i64,
    normalized_url: &str,
    attrs: Option<&PageAttributes>,
) -> StorageResult<UrlNode> {
    let empty = PageAttributes::default();
    let attrs = attrs.unwrap_or(&empty);

    let sql = format!(
        "INSERT INTO urls (domain_id, url, status_code, canonical, title, description, last_crawled_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(domain_id, url) DO UPDATE SET
             status_code = COALESCE(excluded.status_code, urls.status_code),
             canonical = COALESCE(excluded.canonical, urls.canonical),
             title = COALESCE(excluded.title, urls.title),
             description = COALESCE(excluded.description, urls.description),
             last_crawled_at = COALESCE(excluded.last_crawled_at, urls.last_crawled_at)
         RETURNING {}",
        URL_COLUMNS
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let node = stmt.query_row(
        params![
            domain_id,
            normalized_url,
            attrs.status_code,
            attrs.canonical,
            attrs.title,
            attrs.description,
            attrs.last_crawled_at,
        ],
        map_url_node,
    )?;

    Ok(node)
}

/// Gets a URL node by ID
pub(crate) fn get_url(conn: &Connection, url_id: i64) -> StorageResult<UrlNode> {
    let sql = format!("SELECT {} FROM urls WHERE url_id = ?1", URL_COLUMNS);
    conn.prepare_cached(&sql)?
        .query_row(params![url_id], map_url_node)
        .optional()?
        .ok_or(StorageError::UrlNotFound(url_id))
}

/// Finds a node by its normalized URL within one domain
pub(crate) fn find_url(
    conn: &Connection,
    domain_id: i64,
    normalized_url: &str,
) -> StorageResult<Option<UrlNode>> {
    let sql = format!(
        "SELECT {} FROM urls WHERE domain_id = ?1 AND url = ?2",
        URL_COLUMNS
    );
    let node = conn
        .prepare_cached(&sql)?
        .query_row(params![domain_id, normalized_url], map_url_node)
        .optional()?;
    Ok(node)
}

/// Finds a node with this normalized URL that belongs to another site
///
/// Domains registered for the same host as `host` are the same site and are
/// never reported.
pub(crate) fn find_foreign_url(
    conn: &Connection,
    domain_id: i64,
    host: &str,
    normalized_url: &str,
) -> StorageResult<Option<UrlNode>> {
    let sql = "SELECT u.url_id, u.domain_id, u.url, u.status_code, u.canonical, u.title,
                      u.description, u.last_crawled_at
               FROM urls u
               JOIN domains d ON d.domain_id = u.domain_id
               WHERE u.url = ?1 AND u.domain_id != ?2 AND d.host != ?3
               ORDER BY u.url_id
               LIMIT 1";
    let node = conn
        .prepare_cached(sql)?
        .query_row(params![normalized_url, domain_id, host], map_url_node)
        .optional()?;
    Ok(node)
}

fn list_urls(conn: &Connection, domain_id: i64) -> StorageResult<Vec<UrlNode>> {
    let sql = format!(
        "SELECT {} FROM urls WHERE domain_id = ?1 ORDER BY url_id",
        URL_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let nodes = stmt
        .query_map(params![domain_id], map_url_node)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(nodes)
}

/// Registry of URL nodes
#[derive(Clone)]
pub struct UrlStore {
    db: Database,
}

impl UrlStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Normalizes `url` and inserts or merges its node in `domain_id`
    ///
    /// Without `attrs` a missing node is created as a stub and an existing
    /// node is returned unchanged.
    pub fn upsert(
        &self,
        domain_id: i64,
        url: &str,
        attrs: Option<&PageAttributes>,
    ) -> StorageResult<UrlNode> {
        let normalized = normalize_url(url)?;
        self.db.with_conn(|conn| {
            fetch_domain(conn, domain_id)?;
            upsert_url(conn, domain_id, normalized.as_str(), attrs)
        })
    }

    /// Gets a URL node by ID
    pub fn get(&self, url_id: i64) -> StorageResult<UrlNode> {
        self.db.with_conn(|conn| get_url(conn, url_id))
    }

    /// Looks up a node by URL within a domain without creating it
    pub fn find(&self, domain_id: i64, url: &str) -> StorageResult<Option<UrlNode>> {
        let normalized = normalize_url(url)?;
        self.db
            .with_conn(|conn| find_url(conn, domain_id, normalized.as_str()))
    }

    /// Lists a domain's nodes in insertion order
    pub fn list_by_domain(&self, domain_id: i64) -> StorageResult<Vec<UrlNode>> {
        self.db.with_conn(|conn| {
            fetch_domain(conn, domain_id)?;
            list_urls(conn, domain_id)
        })
    }
}
