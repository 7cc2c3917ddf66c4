use crate::config::types::{AuthConfig, Config, FetcherConfig, FetcherKind, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Minimum HS256 secret length in bytes
const MIN_SECRET_LEN: usize = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    validate_auth_config(&config.auth)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.jwt_secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Validation(format!(
            "jwt-secret must be at least {} bytes (or set CRAWL_GRAPH_JWT_SECRET)",
            MIN_SECRET_LEN
        )));
    }

    if config.issuer.is_empty() {
        return Err(ConfigError::Validation("issuer cannot be empty".to_string()));
    }

    if config.token_ttl_minutes < 1 {
        return Err(ConfigError::Validation(format!(
            "token-ttl-minutes must be >= 1, got {}",
            config.token_ttl_minutes
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if !(1..=3600).contains(&config.timeout_secs) {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 3600, got {}",
            config.timeout_secs
        )));
    }

    if !(1..=100_000).contains(&config.max_pages) {
        return Err(ConfigError::Validation(format!(
            "max-pages must be between 1 and 100000, got {}",
            config.max_pages
        )));
    }

    if config.kind == FetcherKind::Command
        && config.command.first().map_or(true, |p| p.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "command fetcher requires a non-empty command".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
