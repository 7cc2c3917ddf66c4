//! Domain crawl coordinator - runs one crawl of one domain end to end
//!
//! A run goes through these steps:
//! 1. Verify the caller's token and that they own the domain
//! 2. Fetch the site from the seed URL (bounded by a timeout)
//! 3. Take the domain's ingestion lock
//! 4. Ingest the batch in one transaction
//! 5. Return the ingested nodes
//!
//! Runs of different domains proceed in parallel. Runs of the same domain may
//! fetch concurrently, but their commits are serialized by the domain lock.

use crate::auth::{AuthError, AuthService};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::locks::DomainLocks;
use crate::ingest::{IngestError, IngestionPipeline};
use crate::storage::{Database, DomainStore, RunStore, StorageError, UrlNode};
use crate::url::normalize_with_host;
use crate::UrlError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a crawl run failed
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("User {user_id} does not own domain {domain_id}")]
    Forbidden { user_id: i64, domain_id: i64 },

    #[error("Domain {domain_id} not found")]
    NotFound { domain_id: i64 },

    #[error("Invalid seed URL {seed_url:?}: {source}")]
    InvalidSeed { seed_url: String, source: UrlError },

    #[error("Seed URL {seed_url} is not on host {host}")]
    SeedOutsideDomain { seed_url: String, host: String },

    #[error("Fetching domain {domain_id} from {seed_url} failed: {source}")]
    Fetch {
        domain_id: i64,
        seed_url: String,
        source: FetchError,
    },

    #[error("Fetching domain {domain_id} from {seed_url} timed out after {timeout_secs}s")]
    FetchTimeout {
        domain_id: i64,
        seed_url: String,
        timeout_secs: u64,
    },

    #[error("Ingesting domain {domain_id} from {seed_url} failed: {source}")]
    Ingestion {
        domain_id: i64,
        seed_url: String,
        source: IngestError,
    },

    #[error("Crawl of domain {domain_id} from {seed_url} aborted: {reason}")]
    Aborted {
        domain_id: i64,
        seed_url: String,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CrawlError {
    /// Status code a request layer should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::InvalidSeed { .. } | Self::SeedOutsideDomain { .. } => 400,
            Self::FetchTimeout { .. } => 504,
            Self::Fetch { .. } | Self::Ingestion { .. } | Self::Aborted { .. } => 500,
            Self::Storage(e) if e.is_not_found() => 404,
            Self::Storage(_) => 500,
        }
    }
}

/// Runs authenticated crawls and commits their results
pub struct CrawlCoordinator {
    auth: Arc<dyn AuthService>,
    fetcher: Arc<dyn Fetcher>,
    domains: DomainStore,
    runs: RunStore,
    pipeline: IngestionPipeline,
    locks: Arc<DomainLocks>,
    fetch_timeout: Duration,
}

impl CrawlCoordinator {
    pub fn new(
        db: Database,
        auth: Arc<dyn AuthService>,
        fetcher: Arc<dyn Fetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            auth,
            fetcher,
            domains: DomainStore::new(db.clone()),
            runs: RunStore::new(db.clone()),
            pipeline: IngestionPipeline::new(db),
            locks: Arc::new(DomainLocks::new()),
            fetch_timeout,
        }
    }

    /// Crawls `domain_id` from `seed_url` on behalf of the token's user
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UrlNode>)` - The committed page nodes, in fetch order
    /// * `Err(CrawlError)` - The run failed; nothing from it was committed
    ///
    /// Dropping the returned future while the fetch is in flight cancels the
    /// fetch. Once ingestion has started it runs to commit or rollback even if
    /// the future is dropped.
    pub async fn run_crawl(
        &self,
        domain_id: i64,
        seed_url: &str,
        token: &str,
    ) -> Result<Vec<UrlNode>, CrawlError> {
        let user_id = self.auth.verify_token(token).await?;

        let domain = self.domains.get(domain_id).map_err(|e| match e {
            StorageError::DomainNotFound(_) => CrawlError::NotFound { domain_id },
            other => CrawlError::Storage(other),
        })?;
        if domain.user_id != user_id {
            tracing::warn!(user_id, domain_id, "Rejected crawl of domain owned by another user");
            return Err(CrawlError::Forbidden { user_id, domain_id });
        }

        let (seed, seed_host) =
            normalize_with_host(seed_url).map_err(|source| CrawlError::InvalidSeed {
                seed_url: seed_url.to_string(),
                source,
            })?;
        if seed_host != domain.host {
            return Err(CrawlError::SeedOutsideDomain {
                seed_url: seed.to_string(),
                host: domain.host,
            });
        }
        let seed_url = seed.to_string();

        let run_id = self.runs.start(domain_id, &seed_url)?;
        tracing::info!(run_id, domain_id, seed_url = %seed_url, "Starting crawl run");

        let fetch = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&seed));
        let pages = match fetch.await {
            Ok(Ok(pages)) => pages,
            Ok(Err(source)) => {
                let err = CrawlError::Fetch {
                    domain_id,
                    seed_url,
                    source,
                };
                self.record_failure(run_id, &err);
                return Err(err);
            }
            Err(_) => {
                let err = CrawlError::FetchTimeout {
                    domain_id,
                    seed_url,
                    timeout_secs: self.fetch_timeout.as_secs(),
                };
                self.record_failure(run_id, &err);
                return Err(err);
            }
        };

        tracing::debug!(run_id, pages = pages.len(), "Waiting for domain lock");
        let guard = self.locks.acquire(domain_id).await;

        let pipeline = self.pipeline.clone();
        let runs = self.runs.clone();
        let task_seed = seed_url.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            if let Err(e) = runs.mark_lock_acquired(run_id) {
                tracing::warn!(run_id, "Failed to record lock acquisition: {}", e);
            }

            match pipeline.ingest(domain_id, &pages) {
                Ok(nodes) => {
                    if let Err(e) = runs.complete(run_id, nodes.len() as u32) {
                        tracing::warn!(run_id, "Failed to record run completion: {}", e);
                    }
                    tracing::info!(run_id, domain_id, pages = nodes.len(), "Crawl run completed");
                    Ok(nodes)
                }
                Err(source) => {
                    let err = CrawlError::Ingestion {
                        domain_id,
                        seed_url: task_seed,
                        source,
                    };
                    tracing::error!(run_id, "{}", err);
                    if let Err(e) = runs.fail(run_id, &err.to_string()) {
                        tracing::warn!(run_id, "Failed to record run failure: {}", e);
                    }
                    Err(err)
                }
            }
        });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                let err = CrawlError::Aborted {
                    domain_id,
                    seed_url,
                    reason: join_error.to_string(),
                };
                self.record_failure(run_id, &err);
                Err(err)
            }
        }
    }

    fn record_failure(&self, run_id: i64, err: &CrawlError) {
        tracing::error!(run_id, "{}", err);
        if let Err(e) = self.runs.fail(run_id, &err.to_string()) {
            tracing::warn!(run_id, "Failed to record run failure: {}", e);
        }
    }
}
