use serde::Deserialize;

/// Main configuration structure for crawl-graph
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Token verification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 shared secret (overridden by `CRAWL_GRAPH_JWT_SECRET`)
    #[serde(rename = "jwt-secret", default)]
    pub jwt_secret: String,

    /// Expected `iss` claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Lifetime of tokens issued by `crawl-graph token`
    #[serde(rename = "token-ttl-minutes", default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
}

fn default_issuer() -> String {
    "crawl-graph".to_string()
}

fn default_token_ttl() -> i64 {
    60
}

/// Which fetcher implementation crawls sites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Built-in breadth-first HTTP crawler
    #[default]
    Http,
    /// External program printing page records as JSON
    Command,
}

/// Fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub kind: FetcherKind,

    /// Upper bound on one whole fetch, in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of pages the HTTP fetcher visits per run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Program and arguments for the command fetcher; the seed URL is
    /// appended as the last argument
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_pages() -> usize {
    500
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            kind: FetcherKind::default(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
            command: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}
