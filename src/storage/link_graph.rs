//! Link graph: directed internal-link edges between URL nodes
//!
//! Edges are keyed by source and indexed by target, so both directions are
//! index lookups. An ordered pair is stored at most once.

use crate::storage::{get_url, Database, LinkEdge, StorageError, StorageResult};
use rusqlite::{params, Connection};

/// Records an edge between two nodes already known to share a domain
///
/// Returns false if the edge already existed.
pub(crate) fn insert_edge(
    conn: &Connection,
    source_url_id: i64,
    target_url_id: i64,
) -> StorageResult<bool> {
    let inserted = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO link_edges (source_url_id, target_url_id) VALUES (?1, ?2)",
        )?
        .execute(params![source_url_id, target_url_id])?;
    Ok(inserted > 0)
}

fn ensure_url(conn: &Connection, url_id: i64) -> StorageResult<()> {
    get_url(conn, url_id).map(|_| ())
}

fn select_ids(conn: &Connection, sql: &str, url_id: i64) -> StorageResult<Vec<i64>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let ids = stmt
        .query_map(params![url_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn select_urls(conn: &Connection, sql: &str, url_id: i64) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let urls = stmt
        .query_map(params![url_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(urls)
}

/// Directed edge set between URL nodes
#[derive(Clone)]
pub struct LinkGraph {
    db: Database,
}

impl LinkGraph {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records a directed edge; both endpoints must exist in the same domain
    ///
    /// Never creates nodes. Returns false if the edge was already present.
    pub fn add_edge(&self, source_url_id: i64, target_url_id: i64) -> StorageResult<bool> {
        self.db.with_conn(|conn| {
            let source = get_url(conn, source_url_id)?;
            let target = get_url(conn, target_url_id)?;

            if source.domain_id != target.domain_id {
                return Err(StorageError::CrossDomain {
                    source_url_id,
                    target_url_id,
                    source_domain_id: source.domain_id,
                    target_domain_id: target.domain_id,
                });
            }

            insert_edge(conn, source_url_id, target_url_id)
        })
    }

    /// Targets of a node's outbound edges, in the order they were recorded
    pub fn links_from(&self, url_id: i64) -> StorageResult<Vec<i64>> {
        self.db.with_conn(|conn| {
            ensure_url(conn, url_id)?;
            select_ids(
                conn,
                "SELECT target_url_id FROM link_edges WHERE source_url_id = ?1 ORDER BY edge_id",
                url_id,
            )
        })
    }

    /// Sources of a node's inbound edges, in the order they were recorded
    pub fn links_to(&self, url_id: i64) -> StorageResult<Vec<i64>> {
        self.db.with_conn(|conn| {
            ensure_url(conn, url_id)?;
            select_ids(
                conn,
                "SELECT source_url_id FROM link_edges WHERE target_url_id = ?1 ORDER BY edge_id",
                url_id,
            )
        })
    }

    /// URL strings of the pages a node links to
    pub fn internal_links(&self, url_id: i64) -> StorageResult<Vec<String>> {
        self.db.with_conn(|conn| {
            ensure_url(conn, url_id)?;
            select_urls(
                conn,
                "SELECT target.url
                 FROM link_edges e
                 JOIN urls AS target ON target.url_id = e.target_url_id
                 WHERE e.source_url_id = ?1
                 ORDER BY e.edge_id",
                url_id,
            )
        })
    }

    /// URL strings of the pages that link to a node
    pub fn linked_by(&self, url_id: i64) -> StorageResult<Vec<String>> {
        self.db.with_conn(|conn| {
            ensure_url(conn, url_id)?;
            select_urls(
                conn,
                "SELECT source.url
                 FROM link_edges e
                 JOIN urls AS source ON source.url_id = e.source_url_id
                 WHERE e.target_url_id = ?1
                 ORDER BY e.edge_id",
                url_id,
            )
        })
    }

    /// All edges whose source belongs to a domain
    pub fn edges_for_domain(&self, domain_id: i64) -> StorageResult<Vec<LinkEdge>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT e.source_url_id, e.target_url_id
                 FROM link_edges e
                 JOIN urls AS source ON source.url_id = e.source_url_id
                 WHERE source.domain_id = ?1
                 ORDER BY e.edge_id",
            )?;
            let edges = stmt
                .query_map(params![domain_id], |row| {
                    Ok(LinkEdge {
                        source_url_id: row.get(0)?,
                        target_url_id: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(edges)
        })
    }

    /// Counts the edges of a domain
    pub fn edge_count(&self, domain_id: i64) -> StorageResult<u64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*)
                 FROM link_edges e
                 JOIN urls AS source ON source.url_id = e.source_url_id
                 WHERE source.domain_id = ?1",
                params![domain_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}
