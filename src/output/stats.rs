//! Statistics generation from the crawl graph
//!
//! This module extracts per-domain graph statistics from storage and
//! displays them.

use crate::storage::{fetch_domain, Database, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;

/// A link target whose last crawl returned an error status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenTarget {
    pub url: String,
    pub status_code: u16,
    /// Number of pages linking to it
    pub inbound_links: u64,
}

/// Graph statistics for one domain
#[derive(Debug, Clone, Serialize)]
pub struct GraphStatistics {
    pub domain_id: i64,

    /// All URL nodes, crawled or stub
    pub total_urls: u64,

    /// Nodes with crawl data
    pub crawled_urls: u64,

    /// Nodes only known as link targets
    pub stub_urls: u64,

    pub total_edges: u64,

    /// Count of crawled pages by HTTP status
    pub pages_by_status: BTreeMap<u16, u64>,

    /// Linked pages that answered with 4xx/5xx, most linked first
    pub broken_targets: Vec<BrokenTarget>,

    /// Crawled pages no other page links to
    pub orphan_pages: Vec<String>,

    pub last_crawled_at: Option<DateTime<Utc>>,
}

/// Loads statistics for a domain
///
/// # Returns
///
/// * `Ok(GraphStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Unknown domain or failed query
pub fn load_statistics(db: &Database, domain_id: i64) -> StorageResult<GraphStatistics> {
    db.with_conn(|conn| {
        fetch_domain(conn, domain_id)?;

        let (total_urls, stub_urls, last_crawled_at) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status_code IS NULL AND title IS NULL
                                      AND description IS NULL AND last_crawled_at IS NULL
                                 THEN 1 ELSE 0 END), 0),
                    MAX(last_crawled_at)
             FROM urls WHERE domain_id = ?1",
            params![domain_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, Option<DateTime<Utc>>>(2)?,
                ))
            },
        )?;

        let total_edges = conn.query_row(
            "SELECT COUNT(*) FROM link_edges e
             JOIN urls u ON u.url_id = e.source_url_id
             WHERE u.domain_id = ?1",
            params![domain_id],
            |row| row.get::<_, i64>(0),
        )? as u64;

        Ok(GraphStatistics {
            domain_id,
            total_urls,
            crawled_urls: total_urls - stub_urls,
            stub_urls,
            total_edges,
            pages_by_status: pages_by_status(conn, domain_id)?,
            broken_targets: broken_targets(conn, domain_id)?,
            orphan_pages: orphan_pages(conn, domain_id)?,
            last_crawled_at,
        })
    })
}

fn pages_by_status(conn: &Connection, domain_id: i64) -> StorageResult<BTreeMap<u16, u64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT status_code, COUNT(*) FROM urls
         WHERE domain_id = ?1 AND status_code IS NOT NULL
         GROUP BY status_code",
    )?;
    let counts = stmt
        .query_map(params![domain_id], |row| {
            Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(counts)
}

fn broken_targets(conn: &Connection, domain_id: i64) -> StorageResult<Vec<BrokenTarget>> {
    let mut stmt = conn.prepare_cached(
        "SELECT u.url, u.status_code, COUNT(e.edge_id) AS inbound
         FROM urls u
         JOIN link_edges e ON e.target_url_id = u.url_id
         WHERE u.domain_id = ?1 AND u.status_code >= 400
         GROUP BY u.url_id
         ORDER BY inbound DESC, u.url_id",
    )?;
    let targets = stmt
        .query_map(params![domain_id], |row| {
            Ok(BrokenTarget {
                url: row.get(0)?,
                status_code: row.get(1)?,
                inbound_links: row.get::<_, i64>(2)? as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(targets)
}

fn orphan_pages(conn: &Connection, domain_id: i64) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT u.url FROM urls u
         WHERE u.domain_id = ?1 AND u.last_crawled_at IS NOT NULL
           AND NOT EXISTS (
               SELECT 1 FROM link_edges e
               WHERE e.target_url_id = u.url_id AND e.source_url_id != u.url_id
           )
         ORDER BY u.url_id",
    )?;
    let urls = stmt
        .query_map(params![domain_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(urls)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &GraphStatistics) {
    println!("=== Graph Statistics (domain {}) ===\n", stats.domain_id);

    println!("Overview:");
    println!("  Total URLs: {}", stats.total_urls);
    println!("  Crawled: {}", stats.crawled_urls);
    println!("  Stubs: {}", stats.stub_urls);
    println!("  Internal links: {}", stats.total_edges);
    if let Some(last) = stats.last_crawled_at {
        println!("  Last crawled: {}", last.to_rfc3339());
    }
    println!();

    if !stats.pages_by_status.is_empty() {
        println!("Pages by Status:");
        for (status, count) in &stats.pages_by_status {
            let percentage = if stats.crawled_urls > 0 {
                (*count as f64 / stats.crawled_urls as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
        println!();
    }

    if !stats.broken_targets.is_empty() {
        println!("Broken Link Targets ({}):", stats.broken_targets.len());
        for target in &stats.broken_targets {
            println!(
                "  - {} [{}] linked from {} page(s)",
                target.url, target.status_code, target.inbound_links
            );
        }
        println!();
    }

    if !stats.orphan_pages.is_empty() {
        println!("Orphan Pages ({}):", stats.orphan_pages.len());
        for url in &stats.orphan_pages {
            println!("  - {}", url);
        }
        println!();
    }

    let coverage = if stats.total_urls > 0 {
        (stats.crawled_urls as f64 / stats.total_urls as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Coverage: {:.1}% ({} / {} known URLs crawled)",
        coverage, stats.crawled_urls, stats.total_urls
    );
}
