//! Error types for session token issuance and rotation.
//!
//! Every failure path returns a distinct variant. The transport adapter maps
//! them through [`SessionError::kind`], which collapses infrastructure detail
//! into [`ErrorKind::Internal`].

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the session core.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The identifier is unknown to the identity directory.
    #[error("User not found")]
    UserNotFound,

    /// Refresh credential is malformed, unknown, spent, or expired.
    #[error("Refresh token invalid")]
    InvalidRefreshToken,

    /// Access token algorithm, signature, or issuer mismatch.
    #[error("Access token signature invalid")]
    TokenBadSignature,

    /// Access token is past its expiry.
    #[error("Access token expired")]
    TokenExpired,

    /// Access token could not be decoded.
    #[error("Access token malformed: {0}")]
    TokenMalformed(String),

    /// Signing key or algorithm misconfiguration.
    #[error("Signing failure: {0}")]
    SigningFailure(String),

    /// A fingerprint with the same value is already stored.
    #[error("Fingerprint already present in store")]
    FingerprintConflict,

    /// The fingerprint store could not be reached or returned an error.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store or directory call exceeded its deadline.
    #[error("{operation} timed out after {duration:?}")]
    StoreTimeout {
        /// Operation that timed out
        operation: &'static str,
        /// Deadline that was exceeded
        duration: Duration,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Public error taxonomy exposed to the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown identity
    NotFound,
    /// Refresh credential rejected
    InvalidRefreshToken,
    /// Access token rejected
    InvalidAccessToken,
    /// Infrastructure or configuration failure, details withheld
    Internal,
}

impl SessionError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store unavailable error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Re-classify a failure that happened after a refresh credential was
    /// spent. Retrying can only hit the spent credential, so transient store
    /// errors become [`SessionError::Internal`].
    #[must_use]
    pub fn after_spend(self) -> Self {
        if self.is_retryable() {
            Self::Internal(format!("Refresh credential spent before failure: {self}"))
        } else {
            self
        }
    }

    /// Classify into the public taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound => ErrorKind::NotFound,
            Self::InvalidRefreshToken => ErrorKind::InvalidRefreshToken,
            Self::TokenBadSignature | Self::TokenExpired | Self::TokenMalformed(_) => {
                ErrorKind::InvalidAccessToken
            }
            Self::SigningFailure(_)
            | Self::FingerprintConflict
            | Self::StoreUnavailable(_)
            | Self::StoreTimeout { .. }
            | Self::Config(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable error code for responses and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => SESSION_USER_NOT_FOUND,
            Self::InvalidRefreshToken => SESSION_REFRESH_INVALID,
            Self::TokenBadSignature => SESSION_ACCESS_BAD_SIGNATURE,
            Self::TokenExpired => SESSION_ACCESS_EXPIRED,
            Self::TokenMalformed(_) => SESSION_ACCESS_MALFORMED,
            Self::SigningFailure(_) => SESSION_SIGNING_FAILURE,
            Self::FingerprintConflict => SESSION_FINGERPRINT_CONFLICT,
            Self::StoreUnavailable(_) | Self::StoreTimeout { .. } => SESSION_STORE_UNAVAILABLE,
            Self::Config(_) => SESSION_CONFIG_ERROR,
            Self::Internal(_) => SESSION_INTERNAL,
        }
    }

    /// Whether the whole call may be retried.
    ///
    /// Only transient store failures qualify, and only until the atomic take
    /// commits. Later failures go through [`SessionError::after_spend`].
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout { .. })
    }

    /// Message safe to return to a client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal error".to_string(),
            ErrorKind::InvalidAccessToken => "Access token invalid".to_string(),
            ErrorKind::NotFound | ErrorKind::InvalidRefreshToken => self.to_string(),
        }
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Record serialization failed: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::SigningFailure(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Blocking task failed: {err}"))
    }
}

// Error codes for transport responses
/// Unknown identity.
pub const SESSION_USER_NOT_FOUND: &str = "SESSION_USER_NOT_FOUND";
/// Refresh credential rejected.
pub const SESSION_REFRESH_INVALID: &str = "SESSION_REFRESH_INVALID";
/// Access token signature, algorithm or issuer mismatch.
pub const SESSION_ACCESS_BAD_SIGNATURE: &str = "SESSION_ACCESS_BAD_SIGNATURE";
/// Access token expired.
pub const SESSION_ACCESS_EXPIRED: &str = "SESSION_ACCESS_EXPIRED";
/// Access token undecodable.
pub const SESSION_ACCESS_MALFORMED: &str = "SESSION_ACCESS_MALFORMED";
/// Token could not be signed.
pub const SESSION_SIGNING_FAILURE: &str = "SESSION_SIGNING_FAILURE";
/// Duplicate fingerprint.
pub const SESSION_FINGERPRINT_CONFLICT: &str = "SESSION_FINGERPRINT_CONFLICT";
/// Store unreachable or timed out.
pub const SESSION_STORE_UNAVAILABLE: &str = "SESSION_STORE_UNAVAILABLE";
/// Invalid configuration.
pub const SESSION_CONFIG_ERROR: &str = "SESSION_CONFIG_ERROR";
/// Anything else.
pub const SESSION_INTERNAL: &str = "SESSION_INTERNAL";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_taxonomy() {
        assert_eq!(SessionError::UserNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            SessionError::InvalidRefreshToken.kind(),
            ErrorKind::InvalidRefreshToken
        );
        assert_eq!(SessionError::TokenExpired.kind(), ErrorKind::InvalidAccessToken);
        assert_eq!(SessionError::store("down").kind(), ErrorKind::Internal);
        assert_eq!(SessionError::FingerprintConflict.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(SessionError::store("connection reset").is_retryable());
        assert!(SessionError::StoreTimeout {
            operation: "take_if_valid",
            duration: Duration::from_millis(50),
        }
        .is_retryable());
        assert!(!SessionError::InvalidRefreshToken.is_retryable());
        assert!(!SessionError::SigningFailure("bad key".to_string()).is_retryable());
    }

    #[test]
    fn test_after_spend_not_retryable() {
        let err = SessionError::store("connection reset").after_spend();
        assert!(matches!(err, SessionError::Internal(_)));
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Internal);

        let timeout = SessionError::StoreTimeout {
            operation: "put",
            duration: Duration::from_millis(50),
        }
        .after_spend();
        assert!(!timeout.is_retryable());

        assert!(matches!(
            SessionError::UserNotFound.after_spend(),
            SessionError::UserNotFound
        ));
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = SessionError::store("redis://10.0.0.5:6379 refused");
        assert_eq!(err.public_message(), "Internal error");
        assert!(!err.public_message().contains("10.0.0.5"));

        let err = SessionError::TokenMalformed("bad base64 in segment 2".to_string());
        assert_eq!(err.public_message(), "Access token invalid");

        assert_eq!(
            SessionError::InvalidRefreshToken.public_message(),
            "Refresh token invalid"
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(SessionError::InvalidRefreshToken.code(), SESSION_REFRESH_INVALID);
        assert_eq!(
            SessionError::StoreTimeout {
                operation: "put",
                duration: Duration::from_secs(1),
            }
            .code(),
            SESSION_STORE_UNAVAILABLE
        );
    }
}
