//! Storage error types

use crate::UrlError;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Domain not found: {0}")]
    DomainNotFound(i64),

    #[error("URL not found: {0}")]
    UrlNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error(
        "Edge {source_url_id} -> {target_url_id} crosses domains ({source_domain_id} -> {target_domain_id})"
    )]
    CrossDomain {
        source_url_id: i64,
        target_url_id: i64,
        source_domain_id: i64,
        target_domain_id: i64,
    },
}

impl StorageError {
    /// Returns true for lookups of rows that do not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DomainNotFound(_) | Self::UrlNotFound(_) | Self::RunNotFound(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(StorageError::DomainNotFound(1).is_not_found());
        assert!(StorageError::UrlNotFound(1).is_not_found());
        assert!(StorageError::RunNotFound(1).is_not_found());
        assert!(!StorageError::Database("x".to_string()).is_not_found());
    }
}
