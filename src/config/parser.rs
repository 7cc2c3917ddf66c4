use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable that overrides `[auth] jwt-secret`
pub const JWT_SECRET_ENV: &str = "CRAWL_GRAPH_JWT_SECRET";

/// Loads and parses a configuration file from the given path
///
/// A non-empty `CRAWL_GRAPH_JWT_SECRET` replaces the file's JWT secret
/// before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content, std::env::var(JWT_SECRET_ENV).ok())?;
    Ok(config)
}

/// Parses configuration text, applies the secret override, and validates
fn parse_config(content: &str, secret_override: Option<String>) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    if let Some(secret) = secret_override.filter(|s| !s.is_empty()) {
        tracing::debug!("Using JWT secret from {}", JWT_SECRET_ENV);
        config.auth.jwt_secret = secret;
    }

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration that
/// produced them.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
