//! Domain registry

use crate::storage::url_store::{map_url_node, URL_COLUMNS};
use crate::storage::{Database, Domain, StorageError, StorageResult, UrlNode};
use crate::url::normalize_with_host;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_domain(row: &Row<'_>) -> rusqlite::Result<Domain> {
    Ok(Domain {
        id: row.get(0)?,
        user_id: row.get(1)?,
        url: row.get(2)?,
        host: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Gets a domain by ID
pub(crate) fn fetch_domain(conn: &Connection, domain_id: i64) -> StorageResult<Domain> {
    conn.prepare_cached(
        "SELECT domain_id, user_id, url, host, created_at FROM domains WHERE domain_id = ?1",
    )?
    .query_row(params![domain_id], map_domain)
    .optional()?
    .ok_or(StorageError::DomainNotFound(domain_id))
}

/// Registry of user-owned domains
#[derive(Clone)]
pub struct DomainStore {
    db: Database,
}

impl DomainStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registers a site root for a user
    pub fn create(&self, user_id: i64, url: &str) -> StorageResult<Domain> {
        let (normalized, host) = normalize_with_host(url)?;
        let now = Utc::now();

        let domain = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO domains (user_id, url, host, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, normalized.as_str(), host, now],
            )?;
            fetch_domain(conn, conn.last_insert_rowid())
        })?;

        tracing::info!(
            domain_id = domain.id,
            user_id,
            "Registered domain {}",
            domain.url
        );
        Ok(domain)
    }

    /// Gets a domain by ID
    pub fn get(&self, domain_id: i64) -> StorageResult<Domain> {
        self.db.with_conn(|conn| fetch_domain(conn, domain_id))
    }

    /// Lists a user's domains in registration order
    pub fn list_for_user(&self, user_id: i64) -> StorageResult<Vec<Domain>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT domain_id, user_id, url, host, created_at
                 FROM domains WHERE user_id = ?1 ORDER BY domain_id",
            )?;
            let domains = stmt
                .query_map(params![user_id], map_domain)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(domains)
        })
    }

    /// Deletes a user's domain together with its URLs, edges and runs
    ///
    /// A domain owned by someone else is reported as not found.
    pub fn delete(&self, domain_id: i64, user_id: i64) -> StorageResult<()> {
        let deleted = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM domains WHERE domain_id = ?1 AND user_id = ?2",
                params![domain_id, user_id],
            )?)
        })?;

        if deleted == 0 {
            return Err(StorageError::DomainNotFound(domain_id));
        }

        tracing::info!(domain_id, user_id, "Deleted domain");
        Ok(())
    }

    /// Returns the most recently crawled page of a domain
    pub fn latest_crawl(&self, domain_id: i64) -> StorageResult<Option<UrlNode>> {
        self.db.with_conn(|conn| {
            fetch_domain(conn, domain_id)?;
            let sql = format!(
                "SELECT {} FROM urls
                 WHERE domain_id = ?1 AND last_crawled_at IS NOT NULL
                 ORDER BY last_crawled_at DESC, url_id DESC
                 LIMIT 1",
                URL_COLUMNS
            );
            let node = conn
                .prepare_cached(&sql)?
                .query_row(params![domain_id], map_url_node)
                .optional()?;
            Ok(node)
        })
    }
}
