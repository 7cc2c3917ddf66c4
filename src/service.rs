//! Service façade
//!
//! [`CrawlService`] is the request layer of the crate: every user-facing
//! operation goes through it, and every failure comes back as a
//! [`CrawlGraphError`] carrying a status code.

use crate::auth::AuthService;
use crate::crawler::{CrawlCoordinator, Fetcher};
use crate::output::{load_statistics, GraphStatistics};
use crate::storage::{
    Database, Domain, DomainStore, LinkGraph, RunRecord, RunStore, UrlNode, UrlStore,
};
use crate::{CrawlGraphError, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A domain together with its most recently crawled page
#[derive(Debug, Clone, Serialize)]
pub struct DomainDetails {
    #[serde(flatten)]
    pub domain: Domain,
    pub latest_crawl: Option<UrlNode>,
}

/// Entry point for domain management, crawling and graph reads
pub struct CrawlService {
    db: Database,
    auth: Arc<dyn AuthService>,
    domains: DomainStore,
    urls: UrlStore,
    graph: LinkGraph,
    runs: RunStore,
    coordinator: CrawlCoordinator,
}

impl CrawlService {
    pub fn new(
        db: Database,
        auth: Arc<dyn AuthService>,
        fetcher: Arc<dyn Fetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            coordinator: CrawlCoordinator::new(db.clone(), auth.clone(), fetcher, fetch_timeout),
            domains: DomainStore::new(db.clone()),
            urls: UrlStore::new(db.clone()),
            graph: LinkGraph::new(db.clone()),
            runs: RunStore::new(db.clone()),
            auth,
            db,
        }
    }

    /// Loads a domain and checks that `user_id` owns it
    fn owned_domain(&self, user_id: i64, domain_id: i64) -> Result<Domain> {
        let domain = self.domains.get(domain_id)?;
        if domain.user_id != user_id {
            return Err(CrawlGraphError::Forbidden { user_id, domain_id });
        }
        Ok(domain)
    }

    /// Registers a site for the token's user
    pub async fn register_domain(&self, token: &str, url: &str) -> Result<Domain> {
        let user_id = self.auth.verify_token(token).await?;
        Ok(self.domains.create(user_id, url)?)
    }

    /// Lists the token user's domains
    pub async fn list_domains(&self, token: &str) -> Result<Vec<Domain>> {
        let user_id = self.auth.verify_token(token).await?;
        Ok(self.domains.list_for_user(user_id)?)
    }

    /// Returns a domain with its latest crawled page
    pub async fn domain_details(&self, token: &str, domain_id: i64) -> Result<DomainDetails> {
        let user_id = self.auth.verify_token(token).await?;
        let domain = self.owned_domain(user_id, domain_id)?;
        let latest_crawl = self.domains.latest_crawl(domain_id)?;
        Ok(DomainDetails {
            domain,
            latest_crawl,
        })
    }

    /// Deletes a domain and everything crawled for it
    pub async fn delete_domain(&self, token: &str, domain_id: i64) -> Result<()> {
        let user_id = self.auth.verify_token(token).await?;
        self.owned_domain(user_id, domain_id)?;
        Ok(self.domains.delete(domain_id, user_id)?)
    }

    /// Crawls a domain and commits the result
    pub async fn crawl(&self, domain_id: i64, seed_url: &str, token: &str) -> Result<Vec<UrlNode>> {
        Ok(self
            .coordinator
            .run_crawl(domain_id, seed_url, token)
            .await?)
    }

    /// All URL nodes of a domain, in insertion order
    pub fn domain_urls(&self, domain_id: i64) -> Result<Vec<UrlNode>> {
        Ok(self.urls.list_by_domain(domain_id)?)
    }

    /// URLs the page links to
    pub fn internal_links(&self, url_id: i64) -> Result<Vec<String>> {
        Ok(self.graph.internal_links(url_id)?)
    }

    /// URLs of pages linking to the page
    pub fn linked_by(&self, url_id: i64) -> Result<Vec<String>> {
        Ok(self.graph.linked_by(url_id)?)
    }

    pub fn domain_stats(&self, domain_id: i64) -> Result<GraphStatistics> {
        Ok(load_statistics(&self.db, domain_id)?)
    }

    pub fn domain_runs(&self, domain_id: i64) -> Result<Vec<RunRecord>> {
        self.domains.get(domain_id)?;
        Ok(self.runs.list_for_domain(domain_id)?)
    }
}
