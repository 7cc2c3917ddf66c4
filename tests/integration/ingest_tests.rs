//! Integration tests for the URL store, link graph and ingestion pipeline
//!
//! These run against on-disk databases through the public API only.

use crawl_graph::ingest::{CrawledPage, IngestError, IngestionPipeline};
use crawl_graph::storage::{Database, DomainStore, LinkGraph, PageAttributes, UrlStore};
use std::collections::HashSet;
use tempfile::TempDir;

struct Graph {
    _dir: TempDir,
    db: Database,
    domains: DomainStore,
    urls: UrlStore,
    links: LinkGraph,
    pipeline: IngestionPipeline,
}

fn open_graph() -> Graph {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::open(&dir.path().join("graph.db")).expect("Failed to open database");
    Graph {
        domains: DomainStore::new(db.clone()),
        urls: UrlStore::new(db.clone()),
        links: LinkGraph::new(db.clone()),
        pipeline: IngestionPipeline::new(db.clone()),
        db,
        _dir: dir,
    }
}

fn page(url: &str, title: &str, links: &[&str]) -> CrawledPage {
    CrawledPage {
        title: Some(title.to_string()),
        status_code: Some(200),
        ..CrawledPage::new(url).with_links(links.iter().copied())
    }
}

#[test]
fn test_two_page_site_end_to_end() {
    let g = open_graph();
    let domain = g.domains.create(1, "a.com").unwrap();

    let nodes = g
        .pipeline
        .ingest(
            domain.id,
            &[
                CrawledPage::new("a.com/").with_links(["a.com/b"]),
                CrawledPage::new("a.com/b").with_links(["a.com/"]),
            ],
        )
        .expect("Ingestion failed");

    let all = g.urls.list_by_domain(domain.id).unwrap();
    assert_eq!(all.len(), 2, "expected exactly two URL nodes");
    assert!(all.iter().all(|n| n.last_crawled_at.is_some()));

    let (home, b) = (nodes[0].id, nodes[1].id);
    assert_eq!(g.links.links_from(home).unwrap(), vec![b]);
    assert_eq!(g.links.links_from(b).unwrap(), vec![home]);
    assert_eq!(g.links.edge_count(domain.id).unwrap(), 2);
    assert_eq!(g.links.internal_links(home).unwrap(), vec!["https://a.com/b"]);
    assert_eq!(g.links.linked_by(home).unwrap(), vec!["https://a.com/b"]);
}

#[test]
fn test_upsert_is_idempotent_across_spellings() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();

    let ids: HashSet<i64> = [
        "https://a.com/docs",
        "https://a.com/docs/",
        "https://A.COM/docs#intro",
        "https://a.com/docs?utm=1",
        "https://a.com/x/../docs",
    ]
    .iter()
    .map(|u| g.urls.upsert(domain.id, u, None).unwrap().id)
    .collect();

    assert_eq!(ids.len(), 1);
    assert_eq!(g.urls.list_by_domain(domain.id).unwrap().len(), 1);
}

#[test]
fn test_stub_promotion_keeps_identity() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();

    g.pipeline
        .ingest(domain.id, &[page("https://a.com/", "Home", &["https://a.com/b"])])
        .unwrap();
    let stub = g.urls.find(domain.id, "https://a.com/b").unwrap().unwrap();
    assert!(stub.is_stub());

    g.pipeline
        .ingest(domain.id, &[page("https://a.com/b", "B", &[])])
        .unwrap();
    let promoted = g.urls.get(stub.id).unwrap();

    assert_eq!(promoted.title.as_deref(), Some("B"));
    assert!(promoted.last_crawled_at.is_some());
    assert_eq!(g.urls.list_by_domain(domain.id).unwrap().len(), 2);
}

#[test]
fn test_graph_symmetry() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();
    let url = |i: usize| format!("https://a.com/p{}", i);

    // Page i links to (i*3)%7, (i+1)%7 and itself when i is even.
    let pages: Vec<CrawledPage> = (0..7)
        .map(|i| {
            let mut links = vec![url((i * 3) % 7), url((i + 1) % 7)];
            if i % 2 == 0 {
                links.push(url(i));
            }
            CrawledPage::new(url(i)).with_links(links)
        })
        .collect();
    g.pipeline.ingest(domain.id, &pages).unwrap();

    let nodes = g.urls.list_by_domain(domain.id).unwrap();
    for a in &nodes {
        for b in g.links.links_from(a.id).unwrap() {
            assert!(
                g.links.links_to(b).unwrap().contains(&a.id),
                "edge {} -> {} missing from target index",
                a.id,
                b
            );
        }
        for b in g.links.links_to(a.id).unwrap() {
            assert!(g.links.links_from(b).unwrap().contains(&a.id));
        }
    }
}

#[test]
fn test_failed_batch_is_atomic() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();
    g.pipeline
        .ingest(domain.id, &[page("https://a.com/", "Before", &[])])
        .unwrap();

    let err = g
        .pipeline
        .ingest(
            domain.id,
            &[
                page("https://a.com/", "After", &["https://a.com/1"]),
                page("https://a.com/1", "One", &["https://a.com/2"]),
                page("https://a.com/2", "Two", &[""]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidUrl { .. }));

    let nodes = g.urls.list_by_domain(domain.id).unwrap();
    assert_eq!(nodes.len(), 1, "no page of the failed batch may persist");
    assert_eq!(nodes[0].title.as_deref(), Some("Before"));
    assert_eq!(g.links.edge_count(domain.id).unwrap(), 0);
}

#[test]
fn test_cross_domain_link_fails_batch() {
    let g = open_graph();
    let a = g.domains.create(1, "https://a.com/").unwrap();
    let b = g.domains.create(1, "https://b.com/").unwrap();
    g.pipeline
        .ingest(b.id, &[page("https://b.com/", "B", &[])])
        .unwrap();

    let err = g
        .pipeline
        .ingest(
            a.id,
            &[
                page("https://a.com/", "A", &["https://a.com/1"]),
                page("https://a.com/1", "One", &["https://a.com/2"]),
                page("https://a.com/2", "Two", &["https://b.com/"]),
            ],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::CrossDomainLink { target_domain_id, .. } if target_domain_id == b.id
    ));
    assert!(g.urls.list_by_domain(a.id).unwrap().is_empty());
}

#[test]
fn test_recrawl_keeps_one_edge_per_pair() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();
    let batch = [page("https://a.com/", "Home", &["https://a.com/b", "https://a.com/b#top"])];

    for _ in 0..3 {
        g.pipeline.ingest(domain.id, &batch).unwrap();
    }

    assert_eq!(g.links.edge_count(domain.id).unwrap(), 1);
    assert_eq!(g.urls.list_by_domain(domain.id).unwrap().len(), 2);
}

#[test]
fn test_partial_attributes_merge() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();

    g.pipeline
        .ingest(
            domain.id,
            &[CrawledPage {
                description: Some("About".to_string()),
                ..page("https://a.com/", "Home", &[])
            }],
        )
        .unwrap();
    let node = g
        .urls
        .upsert(
            domain.id,
            "https://a.com/",
            Some(&PageAttributes {
                status_code: Some(301),
                ..PageAttributes::default()
            }),
        )
        .unwrap();

    assert_eq!(node.status_code, Some(301));
    assert_eq!(node.title.as_deref(), Some("Home"));
    assert_eq!(node.description.as_deref(), Some("About"));
}

#[test]
fn test_graph_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");

    let domain_id = {
        let db = Database::open(&path).unwrap();
        let domain = DomainStore::new(db.clone()).create(1, "https://a.com/").unwrap();
        IngestionPipeline::new(db)
            .ingest(domain.id, &[page("https://a.com/", "Home", &["https://a.com/b"])])
            .unwrap();
        domain.id
    };

    let db = Database::open(&path).unwrap();
    assert_eq!(UrlStore::new(db.clone()).list_by_domain(domain_id).unwrap().len(), 2);
    assert_eq!(LinkGraph::new(db).edge_count(domain_id).unwrap(), 1);
}

#[test]
fn test_deleting_domain_removes_graph() {
    let g = open_graph();
    let domain = g.domains.create(1, "https://a.com/").unwrap();
    let nodes = g
        .pipeline
        .ingest(domain.id, &[page("https://a.com/", "Home", &["https://a.com/b"])])
        .unwrap();

    g.domains.delete(domain.id, 1).unwrap();

    assert!(g.urls.get(nodes[0].id).unwrap_err().is_not_found());
    let remaining: i64 = g
        .db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM link_edges", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(remaining, 0);
}
