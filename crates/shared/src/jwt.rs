//! JWT bearer token verification and issuance.
//!
//! Token issuance lives in an external identity service; this module verifies
//! HS256 bearer tokens and can mint short-lived tokens for tests and tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during token handling.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid or expired token")]
    Invalid,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: rider or driver identity.
    pub sub: String,
    /// Expiration time (unix seconds).
    pub exp: i64,
    /// Issued-at time (unix seconds).
    pub iat: i64,
}

/// Symmetric-key token service.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    expiry: Duration,
}

impl JwtService {
    /// Create a service from a shared secret and algorithm name (e.g. "HS256").
    pub fn new(secret: &str, algorithm: &str, expire_minutes: i64) -> Result<Self, JwtError> {
        let algorithm = match algorithm {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => return Err(JwtError::UnsupportedAlgorithm(other.to_string())),
        };
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            expiry: Duration::minutes(expire_minutes),
        })
    }

    /// Sign an access token for the given subject.
    pub fn issue(&self, subject: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Decode and validate a bearer token, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::new(self.algorithm);
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| JwtError::Invalid)
    }
}
