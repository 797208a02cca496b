//! Fingerprint persistence.
//!
//! The store is the only mutable state shared between requests. Its
//! `take_if_valid` is the single-use enforcement point: check and removal
//! happen in one atomic step, so two racing redemptions of the same credential
//! see exactly one hit.

pub mod memory;
pub mod redis;

pub use memory::MemoryFingerprintStore;
pub use self::redis::RedisFingerprintStore;

use crate::config::StoreBackend;
use crate::error::SessionError;
use crate::refresh::Fingerprint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Metadata persisted alongside a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Identity the credential was issued to
    pub subject: String,
    /// Origin recorded at issuance
    pub origin: String,
    /// Issuance instant
    pub created_at: DateTime<Utc>,
    /// Instant after which the entry is treated as absent
    pub expires_at: DateTime<Utc>,
}

impl FingerprintRecord {
    /// Whether the record can still be redeemed at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Record store for outstanding refresh fingerprints.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// [`SessionError::FingerprintConflict`] if the fingerprint is present,
    /// [`SessionError::StoreUnavailable`] on infrastructure failure.
    async fn put(
        &self,
        fingerprint: &Fingerprint,
        record: &FingerprintRecord,
    ) -> Result<(), SessionError>;

    /// Atomically remove the record and return it if it is valid at `now`.
    ///
    /// Expired records are removed too and reported as `None`.
    async fn take_if_valid(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<Option<FingerprintRecord>, SessionError>;
}

/// Build the configured store backend.
///
/// # Errors
///
/// Returns an error if the Redis connection cannot be established.
pub async fn connect(backend: &StoreBackend) -> Result<Arc<dyn FingerprintStore>, SessionError> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryFingerprintStore::new())),
        StoreBackend::Redis { url } => Ok(Arc::new(RedisFingerprintStore::new(url).await?)),
    }
}

pub(crate) async fn with_deadline<T>(
    operation: &'static str,
    deadline: Duration,
    call: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::StoreTimeout {
            operation,
            duration: deadline,
        }),
    }
}
