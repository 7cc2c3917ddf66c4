//! Ingestion pipeline - commits one crawl batch as a graph update
//!
//! For every page record, in fetcher order:
//! 1. Upsert the page's own node with its crawl attributes
//! 2. Resolve each internal link to a node (reusing it or creating a stub)
//! 3. Record the edge source -> target
//!
//! The whole batch runs in one transaction; any error rolls back every
//! upsert and edge made so far.

use crate::ingest::{CrawledPage, IngestError};
use crate::storage::{
    fetch_domain, find_foreign_url, find_url, get_url, insert_edge, upsert_url, Database, Domain,
    UrlNode,
};
use crate::url::normalize_url;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Counters for one committed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub pages: usize,
    pub stubs_created: usize,
    pub edges_added: usize,
    pub duplicate_edges: usize,
}

/// Turns fetcher output into URL nodes and link edges
#[derive(Clone)]
pub struct IngestionPipeline {
    db: Database,
}

impl IngestionPipeline {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ingests one crawl batch for a domain
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UrlNode>)` - The page nodes, in page order, as committed
    /// * `Err(IngestError)` - Nothing from the batch was committed
    pub fn ingest(
        &self,
        domain_id: i64,
        pages: &[CrawledPage],
    ) -> Result<Vec<UrlNode>, IngestError> {
        self.ingest_with_summary(domain_id, pages)
            .map(|(nodes, _)| nodes)
    }

    /// Same as [`ingest`](Self::ingest), also returning batch counters
    pub fn ingest_with_summary(
        &self,
        domain_id: i64,
        pages: &[CrawledPage],
    ) -> Result<(Vec<UrlNode>, BatchSummary), IngestError> {
        let crawled_at = Utc::now();

        let result = self
            .db
            .transaction(|tx| ingest_batch(tx, domain_id, pages, crawled_at));

        match &result {
            Ok((_, summary)) => tracing::info!(
                domain_id,
                pages = summary.pages,
                stubs = summary.stubs_created,
                edges = summary.edges_added,
                "Committed crawl batch"
            ),
            Err(e) => tracing::warn!(domain_id, "Rolled back crawl batch: {}", e),
        }

        result
    }
}

fn ingest_batch(
    conn: &Connection,
    domain_id: i64,
    pages: &[CrawledPage],
    crawled_at: DateTime<Utc>,
) -> Result<(Vec<UrlNode>, BatchSummary), IngestError> {
    let domain = fetch_domain(conn, domain_id)?;
    let mut summary = BatchSummary::default();
    let mut page_ids = Vec::with_capacity(pages.len());

    for page in pages {
        let normalized = normalize_url(&page.url).map_err(|source| IngestError::InvalidUrl {
            url: page.url.clone(),
            source,
        })?;
        let attrs = page.attributes(crawled_at);
        let source = upsert_url(conn, domain.id, normalized.as_str(), Some(&attrs))?;
        tracing::debug!(url_id = source.id, "Ingested page {}", source.url);

        for link in &page.internal_links {
            let (target, created) = resolve_target(conn, &domain, link)?;
            if created {
                summary.stubs_created += 1;
            }

            if target.domain_id != source.domain_id {
                return Err(IngestError::CrossDomainLink {
                    source_url: source.url.clone(),
                    target_url: target.url,
                    source_domain_id: source.domain_id,
                    target_domain_id: target.domain_id,
                });
            }

            if insert_edge(conn, source.id, target.id)? {
                summary.edges_added += 1;
            } else {
                summary.duplicate_edges += 1;
            }
        }

        page_ids.push(source.id);
        summary.pages += 1;
    }

    // Re-read so a page that was also enriched later in the batch is returned
    // in its final state.
    let nodes = page_ids
        .into_iter()
        .map(|id| get_url(conn, id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((nodes, summary))
}

/// Resolves a link string to a node, creating a stub when it is unknown
///
/// Returns the node and whether it was created by this call. A URL that is
/// already a node of another registered site resolves to that node; the
/// caller rejects the edge.
fn resolve_target(
    conn: &Connection,
    domain: &Domain,
    link: &str,
) -> Result<(UrlNode, bool), IngestError> {
    let normalized = normalize_url(link).map_err(|source| IngestError::InvalidUrl {
        url: link.to_string(),
        source,
    })?;

    if let Some(node) = find_url(conn, domain.id, normalized.as_str())? {
        return Ok((node, false));
    }

    if let Some(foreign) = find_foreign_url(conn, domain.id, &domain.host, normalized.as_str())? {
        return Ok((foreign, false));
    }

    let stub = upsert_url(conn, domain.id, normalized.as_str(), None)?;
    Ok((stub, true))
}
