//! Configuration module for crawl-graph
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_graph::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-graph.toml")).unwrap();
//! println!("Database: {}", config.database.path);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    AuthConfig, Config, DatabaseConfig, FetcherConfig, FetcherKind, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, JWT_SECRET_ENV};
