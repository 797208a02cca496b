//! Access token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claim set carried by an access token.
///
/// `origin` is informational; verification never compares it against the
/// caller's address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Issuer
    pub iss: String,
    /// Subject (user identifier)
    pub sub: String,
    /// Origin the token was minted for
    pub origin: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl AccessClaims {
    /// Build claims with a fresh `jti`.
    pub fn new(
        issuer: String,
        subject: String,
        origin: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        AccessClaims {
            iss: issuer,
            sub: subject,
            origin,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Valid strictly before `exp`.
    pub fn is_valid_at(&self, timestamp: i64) -> bool {
        timestamp < self.exp
    }

    /// `exp` as a timestamp. `None` if out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
