use crate::auth::{AuthError, AuthService};
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims carried by crawl-graph tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,  // user_id as string
    pub user_id: i64,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// Issues and verifies HS256 tokens
#[derive(Clone)]
pub struct JwtAuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: chrono::Duration,
}

impl JwtAuthService {
    /// Creates a service with a shared secret, issuer and token lifetime
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl: chrono::Duration::minutes(ttl_minutes),
        }
    }

    /// Issues a token for `user_id` with the configured lifetime
    pub fn issue_token(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue_token_with_ttl(user_id, self.ttl)
    }

    /// Issues a token with an explicit lifetime (negative values produce an
    /// already expired token)
    pub fn issue_token_with_ttl(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
    ) -> Result<String, AuthError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Malformed(e.to_string()))
    }

    /// Verifies a token and returns its claims
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed(e.to_string()),
            })
    }
}

#[async_trait]
impl AuthService for JwtAuthService {
    async fn verify_token(&self, token: &str) -> Result<i64, AuthError> {
        let claims = self.decode_claims(token)?;
        tracing::debug!(user_id = claims.user_id, "Verified token");
        Ok(claims.user_id)
    }
}
