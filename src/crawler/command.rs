//! Subprocess fetcher
//!
//! Runs an external crawler as `program args... <seed>` and reads a JSON
//! array of page records from its stdout. The program may report every
//! `<a href>` it saw; links are narrowed to HTTP(S) URLs on the seed's host
//! before the records are returned.

use crate::crawler::fetcher::{same_host_links, seed_and_host, FetchError, Fetcher};
use crate::ingest::CrawledPage;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

/// Delegates crawling to an external program
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
}

impl CommandFetcher {
    /// Creates a fetcher from a command line (program first)
    pub fn new(command: &[String]) -> Result<Self, FetchError> {
        let (program, args) = command.split_first().ok_or(FetchError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl Fetcher for CommandFetcher {
    async fn fetch(&self, seed: &Url) -> Result<Vec<CrawledPage>, FetchError> {
        let (_, host) = seed_and_host(seed)?;
        tracing::info!(program = %self.program, seed_url = %seed, "Running fetcher command");

        // Dropping the future drops the child, which kills it.
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(seed.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(FetchError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut pages: Vec<CrawledPage> = serde_json::from_slice(&output.stdout)
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        for page in &mut pages {
            let before = page.internal_links.len();
            page.internal_links = same_host_links(&page.internal_links, &host);
            if page.internal_links.len() < before {
                tracing::trace!(
                    dropped = before - page.internal_links.len(),
                    "Filtered links of {}",
                    page.url
                );
            }
        }

        tracing::debug!("Fetcher command returned {} pages", pages.len());
        Ok(pages)
    }
}
