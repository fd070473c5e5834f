use std::collections::HashMap;

use auth::JwtError;
use auth::JwtIssuer;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::user::models::Session;
use crate::domain::user::models::TokenClaims;
use crate::domain::user::ports::TokenIssuer;
use crate::user::errors::TokenError;

/// HMAC JWT session issuer backed by the auth library.
pub struct JwtTokenIssuer {
    issuer: JwtIssuer,
}

impl JwtTokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: Vec<String>) -> Self {
        Self {
            issuer: JwtIssuer::new(secret, issuer, audience),
        }
    }
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(msg) => TokenError::SigningFailed(msg),
            JwtError::TokenExpired => TokenError::Expired,
            other => TokenError::Rejected(other.to_string()),
        }
    }
}

fn in_range(timestamp: Option<DateTime<Utc>>) -> Result<DateTime<Utc>, TokenError> {
    timestamp.ok_or_else(|| TokenError::Rejected("Timestamp out of range".to_string()))
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(
        &self,
        subject: &str,
        ttl: Duration,
        custom: HashMap<String, serde_json::Value>,
    ) -> Result<Session, TokenError> {
        let issued = self.issuer.issue(subject, ttl, custom)?;

        Ok(Session {
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    fn parse_and_verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.issuer.parse_and_verify(token)?;

        Ok(TokenClaims {
            issued_at: in_range(claims.issued_at())?,
            not_before: in_range(claims.not_before())?,
            expires_at: in_range(claims.expires_at())?,
            subject: claims.sub,
            issuer: claims.iss,
            audience: claims.aud,
            token_id: claims.jti,
            custom: claims.custom,
        })
    }
}
