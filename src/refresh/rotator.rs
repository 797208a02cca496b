//! Refresh credential state machine.
//!
//! A credential is `issued` when its fingerprint is put in the store and
//! becomes `spent` when a redemption takes it out again. Expired entries are
//! indistinguishable from absent ones. Every successful redemption issues a
//! replacement, so a credential is never usable twice.

use crate::clock::{expiry_after, Clock};
use crate::error::SessionError;
use crate::metrics;
use crate::refresh::credential::RefreshCredential;
use crate::refresh::fingerprint::{Fingerprint, Fingerprinter};
use crate::storage::{with_deadline, FingerprintRecord, FingerprintStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// A newly issued refresh credential.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Raw secret for the client. Not retained server-side.
    pub credential: RefreshCredential,
    /// What the store holds
    pub fingerprint: Fingerprint,
    /// When the store stops honouring it
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    /// Identity the spent credential belonged to
    pub subject: String,
    /// Whether the request origin differs from the issuance origin
    pub anomaly: bool,
    /// Origin recorded when the spent credential was issued
    pub previous_origin: String,
    /// Replacement credential bound to the request origin
    pub issued: IssuedCredential,
}

/// Issues and redeems refresh credentials against a fingerprint store.
pub struct RefreshRotator {
    store: Arc<dyn FingerprintStore>,
    fingerprinter: Arc<Fingerprinter>,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
    store_timeout: Duration,
}

impl RefreshRotator {
    /// `store_timeout` bounds every store call.
    pub fn new(
        store: Arc<dyn FingerprintStore>,
        fingerprinter: Arc<Fingerprinter>,
        clock: Arc<dyn Clock>,
        refresh_ttl: Duration,
        store_timeout: Duration,
    ) -> Self {
        RefreshRotator {
            store,
            fingerprinter,
            clock,
            refresh_ttl,
            store_timeout,
        }
    }

    /// Mint a credential for `subject` bound to `origin` and persist its
    /// fingerprint.
    #[instrument(skip(self))]
    pub async fn issue_new(
        &self,
        subject: &str,
        origin: &str,
    ) -> Result<IssuedCredential, SessionError> {
        let created_at = self.clock.now();
        let expires_at = expiry_after(created_at, self.refresh_ttl)?;

        let credential = RefreshCredential::generate();
        let fingerprint = self.fingerprint(&credential).await?;

        let record = FingerprintRecord {
            subject: subject.to_string(),
            origin: origin.to_string(),
            created_at,
            expires_at,
        };

        let stored = with_deadline(
            "put",
            self.store_timeout,
            self.store.put(&fingerprint, &record),
        )
        .await;
        metrics::record_store_operation("put", if stored.is_ok() { "ok" } else { "error" });
        stored?;

        info!(expires_at = %expires_at, "Issued refresh credential");

        Ok(IssuedCredential {
            credential,
            fingerprint,
            expires_at,
        })
    }

    /// Spend `raw` and issue its replacement bound to `request_origin`.
    ///
    /// Malformed, unknown, spent and expired credentials all fail with
    /// [`SessionError::InvalidRefreshToken`].
    #[instrument(skip(self, raw))]
    pub async fn redeem(
        &self,
        raw: &str,
        request_origin: &str,
    ) -> Result<Redemption, SessionError> {
        let Some(credential) = RefreshCredential::decode(raw) else {
            debug!("Refresh credential did not decode");
            return Err(SessionError::InvalidRefreshToken);
        };

        let fingerprint = self.fingerprint(&credential).await?;
        let now = self.clock.now();

        let taken = with_deadline(
            "take_if_valid",
            self.store_timeout,
            self.store.take_if_valid(&fingerprint, now),
        )
        .await;

        let record = match taken {
            Ok(Some(record)) => {
                metrics::record_store_operation("take_if_valid", "hit");
                record
            }
            Ok(None) => {
                metrics::record_store_operation("take_if_valid", "miss");
                return Err(SessionError::InvalidRefreshToken);
            }
            Err(e) => {
                metrics::record_store_operation("take_if_valid", "error");
                return Err(e);
            }
        };

        let anomaly = record.origin != request_origin;
        if anomaly {
            warn!(
                subject = %record.subject,
                previous_origin = %record.origin,
                "Refresh redeemed from a new origin"
            );
        }

        let issued = self
            .issue_new(&record.subject, request_origin)
            .await
            .map_err(|e| {
                error!(
                    subject = %record.subject,
                    error = %e,
                    "Credential spent but replacement could not be issued"
                );
                e.after_spend()
            })?;

        Ok(Redemption {
            subject: record.subject,
            anomaly,
            previous_origin: record.origin,
            issued,
        })
    }

    async fn fingerprint(&self, credential: &RefreshCredential) -> Result<Fingerprint, SessionError> {
        let fingerprinter = Arc::clone(&self.fingerprinter);
        let credential = credential.clone();
        let fingerprint =
            tokio::task::spawn_blocking(move || fingerprinter.fingerprint(&credential)).await?;
        Ok(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryFingerprintStore;
    use chrono::TimeZone;

    struct Fixture {
        rotator: RefreshRotator,
        store: Arc<MemoryFingerprintStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryFingerprintStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        ));
        let rotator = RefreshRotator::new(
            store.clone(),
            Arc::new(Fingerprinter::new(b"rotator-test-salt", 10).unwrap()),
            clock.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(1),
        );
        Fixture {
            rotator,
            store,
            clock,
        }
    }

    #[tokio::test]
    async fn test_issue_persists_fingerprint_only() {
        let f = fixture();
        let issued = f.rotator.issue_new("user-1", "1.2.3.4").await.unwrap();

        assert_eq!(f.store.len().await, 1);
        assert_eq!(issued.expires_at, f.clock.now() + chrono::Duration::seconds(3600));
        assert_ne!(issued.fingerprint.to_key(), issued.credential.encode());
    }

    #[tokio::test]
    async fn test_redeem_same_origin() {
        let f = fixture();
        let issued = f.rotator.issue_new("user-1", "1.2.3.4").await.unwrap();

        let redemption = f
            .rotator
            .redeem(&issued.credential.encode(), "1.2.3.4")
            .await
            .unwrap();

        assert_eq!(redemption.subject, "user-1");
        assert!(!redemption.anomaly);
        assert_ne!(redemption.issued.credential, issued.credential);
        // old one gone, replacement present
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_redeem_twice_fails() {
        let f = fixture();
        let raw = f
            .rotator
            .issue_new("user-1", "1.2.3.4")
            .await
            .unwrap()
            .credential
            .encode();

        f.rotator.redeem(&raw, "1.2.3.4").await.unwrap();
        let replay = f.rotator.redeem(&raw, "1.2.3.4").await;
        assert!(matches!(replay, Err(SessionError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn test_redeem_new_origin_flags_anomaly() {
        let f = fixture();
        let raw = f
            .rotator
            .issue_new("user-1", "1.2.3.4")
            .await
            .unwrap()
            .credential
            .encode();

        let redemption = f.rotator.redeem(&raw, "9.9.9.9").await.unwrap();
        assert!(redemption.anomaly);
        assert_eq!(redemption.previous_origin, "1.2.3.4");

        // replacement is bound to the new origin
        let next = f
            .rotator
            .redeem(&redemption.issued.credential.encode(), "9.9.9.9")
            .await
            .unwrap();
        assert!(!next.anomaly);
    }

    #[tokio::test]
    async fn test_expired_rejected() {
        let f = fixture();
        let raw = f
            .rotator
            .issue_new("user-1", "1.2.3.4")
            .await
            .unwrap()
            .credential
            .encode();

        f.clock.advance(chrono::Duration::seconds(3601));
        let result = f.rotator.redeem(&raw, "1.2.3.4").await;
        assert!(matches!(result, Err(SessionError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn test_never_issued_and_malformed_rejected() {
        let f = fixture();

        let unknown = RefreshCredential::generate().encode();
        assert!(matches!(
            f.rotator.redeem(&unknown, "1.2.3.4").await,
            Err(SessionError::InvalidRefreshToken)
        ));
        assert!(matches!(
            f.rotator.redeem("%%%not-a-credential%%%", "1.2.3.4").await,
            Err(SessionError::InvalidRefreshToken)
        ));
    }
}
