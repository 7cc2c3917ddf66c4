//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawl graph database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Registered sites, owned by one user each
CREATE TABLE IF NOT EXISTS domains (
    domain_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    host TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_domains_user ON domains(user_id);
CREATE INDEX IF NOT EXISTS idx_domains_host ON domains(host);

-- One node per normalized URL per domain; stubs leave the page columns NULL
CREATE TABLE IF NOT EXISTS urls (
    url_id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain_id INTEGER NOT NULL REFERENCES domains(domain_id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    status_code INTEGER,
    canonical TEXT,
    title TEXT,
    description TEXT,
    last_crawled_at TEXT,
    UNIQUE(domain_id, url)
);

CREATE INDEX IF NOT EXISTS idx_urls_url ON urls(url);

-- Internal links; at most one edge per ordered pair
CREATE TABLE IF NOT EXISTS link_edges (
    edge_id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url_id INTEGER NOT NULL REFERENCES urls(url_id) ON DELETE CASCADE,
    target_url_id INTEGER NOT NULL REFERENCES urls(url_id) ON DELETE CASCADE,
    UNIQUE(source_url_id, target_url_id)
);

CREATE INDEX IF NOT EXISTS idx_link_edges_source ON link_edges(source_url_id);
CREATE INDEX IF NOT EXISTS idx_link_edges_target ON link_edges(target_url_id);

-- Crawl run log, written outside the ingestion transaction
CREATE TABLE IF NOT EXISTS crawl_runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain_id INTEGER NOT NULL REFERENCES domains(domain_id) ON DELETE CASCADE,
    seed_url TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    lock_acquired_at TEXT,
    finished_at TEXT,
    pages_ingested INTEGER,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_runs_domain ON crawl_runs(domain_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
