//! Session issuance entry points.
//!
//! [`SessionIssuer`] is what the transport adapter calls. It composes the
//! access token signer with the refresh rotator and fires best-effort
//! notifications when a refresh arrives from a new origin.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::SessionError;
use crate::identity::{Identity, IdentityDirectory};
use crate::jwt::{AccessClaims, TokenSigner};
use crate::metrics;
use crate::notify::{Notifier, SecurityEvent};
use crate::refresh::{Fingerprinter, RefreshRotator};
use crate::storage::{self, with_deadline, FingerprintStore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Token pair returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Signed access token
    pub access_token: String,
    /// Opaque refresh credential, base64url encoded
    pub refresh_token: String,
}

/// Orchestrates authentication and refresh.
pub struct SessionIssuer {
    directory: Arc<dyn IdentityDirectory>,
    notifier: Arc<dyn Notifier>,
    signer: TokenSigner,
    rotator: RefreshRotator,
    access_ttl: Duration,
    store_timeout: Duration,
    notifier_timeout: Duration,
}

impl SessionIssuer {
    /// Wire the issuer from validated configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing key or fingerprint parameters are
    /// unusable.
    pub fn new(
        config: &Config,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn FingerprintStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        let signer = TokenSigner::new(
            config.jwt_secret.expose_secret().as_bytes(),
            config.jwt_issuer.clone(),
            Arc::clone(&clock),
        )?;
        let fingerprinter = Fingerprinter::new(
            config.fingerprint_salt.expose_secret().as_bytes(),
            config.fingerprint_iterations,
        )?;
        let rotator = RefreshRotator::new(
            store,
            Arc::new(fingerprinter),
            clock,
            config.refresh_token_ttl,
            config.store_timeout,
        );

        Ok(Self {
            directory,
            notifier,
            signer,
            rotator,
            access_ttl: config.access_token_ttl,
            store_timeout: config.store_timeout,
            notifier_timeout: config.notifier_timeout,
        })
    }

    /// Build an issuer using the configured store backend and the wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the configuration
    /// is unusable.
    pub async fn from_config(
        config: &Config,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let store = storage::connect(&config.store_backend).await?;
        Self::new(config, directory, notifier, store, Arc::new(SystemClock))
    }

    /// Issue a token pair for a pre-authenticated identifier.
    ///
    /// # Errors
    ///
    /// [`SessionError::UserNotFound`] for unknown identifiers; store and
    /// signing failures otherwise.
    #[instrument(skip(self))]
    pub async fn authenticate(&self, identifier: &str, origin: &str) -> Result<Tokens, SessionError> {
        let identity = self.lookup(identifier).await?;

        let access = self.signer.mint(&identity.identifier, origin, self.access_ttl)?;
        let issued = self.rotator.issue_new(&identity.identifier, origin).await?;

        metrics::record_token_issued("access");
        metrics::record_token_issued("refresh");
        info!(subject = %identity.identifier, "Issued token pair");

        Ok(Tokens {
            access_token: access.token,
            refresh_token: issued.credential.encode(),
        })
    }

    /// Exchange a refresh credential for a new token pair.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidRefreshToken`] when the credential is not
    /// redeemable, [`SessionError::UserNotFound`] when its subject has left
    /// the directory; store and signing failures otherwise. Notification
    /// failures never surface here.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str, origin: &str) -> Result<Tokens, SessionError> {
        let result = self.rotate(refresh_token, origin).await;
        match &result {
            Ok(_) => metrics::record_refresh("ok"),
            Err(e) => metrics::record_refresh(e.code()),
        }
        result
    }

    async fn rotate(&self, refresh_token: &str, origin: &str) -> Result<Tokens, SessionError> {
        let redemption = self.rotator.redeem(refresh_token, origin).await?;
        let identity = self
            .lookup(&redemption.subject)
            .await
            .map_err(SessionError::after_spend)?;

        if redemption.anomaly {
            metrics::record_security_event("NEW_ORIGIN");
            let event = SecurityEvent::NewOrigin {
                subject: redemption.subject.clone(),
                previous_origin: redemption.previous_origin.clone(),
                new_origin: origin.to_string(),
            };
            self.notify_best_effort(&identity, &event).await;
        }

        let access = self.signer.mint(&redemption.subject, origin, self.access_ttl)?;

        metrics::record_token_issued("access");
        metrics::record_token_issued("refresh");
        info!(
            subject = %redemption.subject,
            anomaly = redemption.anomaly,
            "Rotated token pair"
        );

        Ok(Tokens {
            access_token: access.token,
            refresh_token: redemption.issued.credential.encode(),
        })
    }

    /// Verify an access token minted by this issuer.
    ///
    /// # Errors
    ///
    /// See [`TokenSigner::verify`].
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, SessionError> {
        self.signer.verify(token)
    }

    async fn lookup(&self, identifier: &str) -> Result<Identity, SessionError> {
        with_deadline(
            "get_by_identifier",
            self.store_timeout,
            self.directory.get_by_identifier(identifier),
        )
        .await
    }

    async fn notify_best_effort(&self, identity: &Identity, event: &SecurityEvent) {
        let delivery = tokio::time::timeout(
            self.notifier_timeout,
            self.notifier.notify(&identity.contact_address, event),
        )
        .await;

        match delivery {
            Ok(Ok(())) => metrics::record_notification("delivered"),
            Ok(Err(e)) => {
                metrics::record_notification("failed");
                warn!(
                    subject = %identity.identifier,
                    event_type = event.kind(),
                    error = %e,
                    "Notification failed"
                );
            }
            Err(_) => {
                metrics::record_notification("timeout");
                warn!(
                    subject = %identity.identifier,
                    event_type = event.kind(),
                    timeout = ?self.notifier_timeout,
                    "Notification timed out"
                );
            }
        }
    }
}
