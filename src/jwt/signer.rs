//! Access token minting and verification.
//!
//! Tokens are HS512 JWTs signed with a symmetric key handed in at
//! construction. Expiry is checked against the injected [`Clock`] rather than
//! the library's wall clock so TTL boundaries are testable.

use crate::clock::{expiry_after, Clock};
use crate::error::SessionError;
use crate::jwt::claims::AccessClaims;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use std::time::Duration;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Compact JWS serialization
    pub token: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

/// Stateless signer for access tokens.
pub struct TokenSigner {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    /// Create a signer from a symmetric secret.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SigningFailure`] if the secret is empty.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::SigningFailure(
                "Signing key must not be empty".to_string(),
            ));
        }

        let issuer = issuer.into();
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is evaluated against the injected clock in verify().
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_issuer(&[issuer.as_str()]);

        Ok(Self {
            issuer,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }

    /// Mint a token for `subject` expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SigningFailure`] if encoding fails and
    /// [`SessionError::Config`] if `ttl` overflows the timestamp range.
    pub fn mint(
        &self,
        subject: &str,
        origin: &str,
        ttl: Duration,
    ) -> Result<AccessToken, SessionError> {
        let now = self.clock.now();
        let expires_at = expiry_after(now, ttl)?;

        let claims = AccessClaims::new(
            self.issuer.clone(),
            subject.to_string(),
            origin.to_string(),
            now,
            expires_at,
        );

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)?;

        Ok(AccessToken { token, expires_at })
    }

    /// Verify signature, issuer and expiry.
    ///
    /// # Errors
    ///
    /// [`SessionError::TokenBadSignature`] for algorithm, signature or issuer
    /// mismatch, [`SessionError::TokenExpired`] once `now >= exp`, and
    /// [`SessionError::TokenMalformed`] when the token does not decode.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, SessionError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidSignature
                | JwtErrorKind::InvalidAlgorithm
                | JwtErrorKind::InvalidIssuer => SessionError::TokenBadSignature,
                JwtErrorKind::ExpiredSignature => SessionError::TokenExpired,
                _ => SessionError::TokenMalformed(e.to_string()),
            })?;

        let claims = data.claims;
        if !claims.is_valid_at(self.clock.now().timestamp()) {
            return Err(SessionError::TokenExpired);
        }

        Ok(claims)
    }

    /// Issuer embedded in minted tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}
