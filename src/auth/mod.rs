//! Token verification
//!
//! The coordinator and the service façade only depend on [`AuthService`];
//! [`JwtAuthService`] is the HS256 implementation used by the binary.

mod jwt;

pub use jwt::{Claims, JwtAuthService};

use async_trait::async_trait;
use thiserror::Error;

/// Why a token was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token has expired")]
    ExpiredToken,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {0}")]
    Malformed(String),
}

/// Resolves a bearer token to the user it was issued for
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<i64, AuthError>;
}
