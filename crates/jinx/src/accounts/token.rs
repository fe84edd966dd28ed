//! HS256 access/refresh token issuing and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
    #[error("token signing failed: {0}")]
    Signing(String),
}

pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenKind::Access)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.sign(user_id, kind, Utc::now().timestamp(), ttl)
    }

    fn sign(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        issued_at: i64,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            kind,
            iat: issued_at,
            nbf: issued_at,
            exp: issued_at + ttl.num_seconds(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Decode and check signature, expiry and kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(data.claims)
    }
}
