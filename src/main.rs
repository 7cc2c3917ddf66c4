//! crawl-graph main entry point
//!
//! This is the command-line interface for the crawl-graph service.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use crawl_graph::auth::JwtAuthService;
use crawl_graph::config::{load_config_with_hash, Config};
use crawl_graph::crawler::build_fetcher;
use crawl_graph::output::{print_statistics, write_markdown_report};
use crawl_graph::storage::{open_storage, DomainStore};
use crawl_graph::{CrawlGraphError, CrawlService};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// crawl-graph: crawl metadata and internal link graph service
///
/// Registers sites, crawls them, and stores each crawl as a graph of URL
/// nodes and internal-link edges that can be queried per page.
#[derive(Parser, Debug)]
#[command(name = "crawl-graph")]
#[command(version)]
#[command(about = "Crawl metadata and internal link graph service", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Bearer token for commands that act on behalf of a user
    #[arg(long, env = "CRAWL_GRAPH_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print it
    Check,

    /// Issue a token for a user
    Token {
        #[arg(long)]
        user: i64,
    },

    /// Manage registered domains
    Domain {
        #[command(subcommand)]
        action: DomainCommand,
    },

    /// Crawl a domain from a seed URL and store the result
    Crawl { domain_id: i64, seed_url: String },

    /// List a domain's URL nodes
    Urls { domain_id: i64 },

    /// List the URLs a page links to
    InternalLinks { url_id: i64 },

    /// List the URLs of pages linking to a page
    LinkedBy { url_id: i64 },

    /// Show graph statistics for a domain
    Stats {
        domain_id: i64,

        /// Print JSON instead of the text report
        #[arg(long, conflicts_with = "markdown")]
        json: bool,

        /// Write a markdown report to this path
        #[arg(long, value_name = "PATH")]
        markdown: Option<PathBuf>,
    },

    /// List a domain's crawl runs
    Runs { domain_id: i64 },
}

#[derive(Subcommand, Debug)]
enum DomainCommand {
    /// Register a site root
    Add { url: String },
    /// List your domains
    List,
    /// Show a domain with its latest crawled page
    Show { domain_id: i64 },
    /// Delete a domain and its crawl data
    Delete { domain_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let auth = JwtAuthService::new(
        &config.auth.jwt_secret,
        config.auth.issuer.clone(),
        config.auth.token_ttl_minutes,
    );

    match cli.command {
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
        Command::Token { user } => {
            println!("{}", auth.issue_token(user)?);
            Ok(())
        }
        command => run_command(&config, auth, cli.token.as_deref(), command).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_graph=info,warn"),
            1 => EnvFilter::new("crawl_graph=debug,info"),
            2 => EnvFilter::new("crawl_graph=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_check(config: &Config) {
    println!("=== crawl-graph Configuration ===\n");

    println!("Database: {}", config.database.path);

    println!("\nAuth:");
    println!("  Issuer: {}", config.auth.issuer);
    println!("  Token TTL: {} minutes", config.auth.token_ttl_minutes);

    println!("\nFetcher:");
    println!("  Kind: {:?}", config.fetcher.kind);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max pages: {}", config.fetcher.max_pages);
    if !config.fetcher.command.is_empty() {
        println!("  Command: {}", config.fetcher.command.join(" "));
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\n✓ Configuration is valid");
}

async fn run_command(
    config: &Config,
    auth: JwtAuthService,
    token: Option<&str>,
    command: Command,
) -> anyhow::Result<()> {
    let db = open_storage(Path::new(&config.database.path))
        .with_context(|| format!("failed to open database {}", config.database.path))?;
    let fetcher = build_fetcher(&config.user_agent, &config.fetcher)?;
    let service = CrawlService::new(
        db.clone(),
        Arc::new(auth),
        fetcher,
        Duration::from_secs(config.fetcher.timeout_secs),
    );

    let token = || token.ok_or_else(|| anyhow!("this command needs --token or CRAWL_GRAPH_TOKEN"));

    match command {
        Command::Domain { action } => match action {
            DomainCommand::Add { url } => print_json(service.register_domain(token()?, &url).await),
            DomainCommand::List => print_json(service.list_domains(token()?).await),
            DomainCommand::Show { domain_id } => {
                print_json(service.domain_details(token()?, domain_id).await)
            }
            DomainCommand::Delete { domain_id } => {
                print_json(service.delete_domain(token()?, domain_id).await.map(|()| {
                    serde_json::json!({ "deleted": domain_id })
                }))
            }
        },
        Command::Crawl {
            domain_id,
            seed_url,
        } => print_json(service.crawl(domain_id, &seed_url, token()?).await),
        Command::Urls { domain_id } => print_json(service.domain_urls(domain_id)),
        Command::InternalLinks { url_id } => print_json(service.internal_links(url_id)),
        Command::LinkedBy { url_id } => print_json(service.linked_by(url_id)),
        Command::Stats {
            domain_id,
            json,
            markdown,
        } => {
            let stats = service.domain_stats(domain_id).map_err(request_error)?;
            if let Some(path) = markdown {
                let domain = DomainStore::new(db).get(domain_id)?;
                write_markdown_report(&domain, &stats, &path)?;
                println!("✓ Report written to: {}", path.display());
                Ok(())
            } else if json {
                print_json(Ok(stats))
            } else {
                print_statistics(&stats);
                Ok(())
            }
        }
        Command::Runs { domain_id } => print_json(service.domain_runs(domain_id)),
        Command::Check | Command::Token { .. } => Ok(()),
    }
}

/// Prints a successful result as pretty JSON
fn print_json<T: Serialize>(result: crawl_graph::Result<T>) -> anyhow::Result<()> {
    let value = result.map_err(request_error)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn request_error(e: CrawlGraphError) -> anyhow::Error {
    tracing::error!(status = e.status_code(), "{}", e);
    anyhow!("{} (status {})", e, e.status_code())
}
