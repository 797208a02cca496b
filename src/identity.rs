//! Identity directory seam.
//!
//! Identities are owned by an external user directory. The core only reads
//! them: once to authenticate and once per refresh to find the contact
//! address for anomaly notifications.

use crate::error::SessionError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque user identifier
    pub identifier: String,
    /// Where security notifications are delivered
    pub contact_address: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(identifier: impl Into<String>, contact_address: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            contact_address: contact_address.into(),
        }
    }
}

/// Read-only lookup into the user directory.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Look up an identity.
    ///
    /// # Errors
    ///
    /// [`SessionError::UserNotFound`] when the identifier is unknown.
    async fn get_by_identifier(&self, identifier: &str) -> Result<Identity, SessionError>;
}

/// In-memory directory for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    identities: RwLock<HashMap<String, Identity>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with `identities`.
    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let map = identities
            .into_iter()
            .map(|identity| (identity.identifier.clone(), identity))
            .collect();
        Self {
            identities: RwLock::new(map),
        }
    }

    /// Add or replace an identity.
    pub async fn insert(&self, identity: Identity) {
        self.identities
            .write()
            .await
            .insert(identity.identifier.clone(), identity);
    }

    /// Remove an identity.
    pub async fn remove(&self, identifier: &str) -> Option<Identity> {
        self.identities.write().await.remove(identifier)
    }
}

#[async_trait]
impl IdentityDirectory for MemoryDirectory {
    async fn get_by_identifier(&self, identifier: &str) -> Result<Identity, SessionError> {
        self.identities
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or(SessionError::UserNotFound)
    }
}
