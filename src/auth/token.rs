//! Signed bearer tokens.
//!
//! Verification is purely cryptographic: the server keeps no session table,
//! so a token stays valid until its expiry claim passes.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email
    pub sub: String,
    /// Issued-at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Issues and verifies HS256-signed bearer tokens
#[derive(Clone)]
pub struct TokenSigner {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    ttl: chrono::Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Sign a token asserting `subject`
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify a token's signature and expiry, returning its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}
