use std::collections::HashMap;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use uuid::Uuid;

use super::claims::Claims;
use super::errors::JwtError;

/// Algorithms accepted on verification. Anything outside the HMAC family is
/// rejected, whatever the token header claims.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HMAC-signed session tokens.
///
/// Secret, issuer and audience are fixed at construction. Verification is a
/// pure function of the token, the secret and the current time: there is no
/// revocation list.
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: Vec<String>,
    validation: Validation,
}

impl JwtIssuer {
    /// Create a new issuer.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    /// * `issuer` - Value of the `iss` claim, required on verification
    /// * `audience` - Values of the `aud` claim; verification requires one of
    ///   them unless the list is empty
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Rotating the secret invalidates every outstanding token
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: Vec<String>) -> Self {
        let algorithm = Algorithm::HS256;
        let issuer = issuer.into();

        let mut validation = Validation::new(algorithm);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);
        validation.set_issuer(&[&issuer]);
        if audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&audience);
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            issuer,
            audience,
            validation,
        }
    }

    /// Sign a token for `subject` valid for `ttl` from now.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed, or `ttl` overflows the
    ///   representable date range
    pub fn issue(
        &self,
        subject: &str,
        ttl: Duration,
        custom: HashMap<String, serde_json::Value>,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| JwtError::EncodingFailed(format!("ttl out of range: {}", ttl)))?;

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            custom,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token's signature and validity window and return its claims.
    ///
    /// # Errors
    /// * `InvalidSignature` - Signed with a different secret
    /// * `UnexpectedAlgorithm` - Header names a non-HMAC algorithm
    /// * `TokenExpired` / `TokenNotYetValid` - Outside the `nbf`..`exp` window
    /// * `InvalidToken` - Wrong issuer or audience, or a missing required claim
    /// * `DecodingFailed` - Structurally malformed token
    pub fn parse_and_verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }
}
