//! Security notifications.
//!
//! Delivery mechanics (SMTP, templating) live outside this crate. Callers of
//! [`Notifier::notify`] treat every failure as best-effort.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

/// Events a user is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    /// A refresh credential was redeemed from an origin other than the one it
    /// was issued to.
    NewOrigin {
        /// Identity the credential belongs to
        subject: String,
        /// Origin recorded at issuance
        previous_origin: String,
        /// Origin of the redeeming request
        new_origin: String,
    },
}

impl SecurityEvent {
    /// Short machine-readable name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NewOrigin { .. } => "NEW_ORIGIN",
        }
    }

    /// Subject line for human-facing delivery.
    #[must_use]
    pub const fn subject_line(&self) -> &'static str {
        match self {
            Self::NewOrigin { .. } => "Attention! Detected new IP",
        }
    }

    /// Message body for human-facing delivery.
    #[must_use]
    pub const fn body(&self) -> &'static str {
        match self {
            Self::NewOrigin { .. } => "You have requested a new access token from a new IP",
        }
    }
}

/// Delivery failure.
#[derive(Error, Debug)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification capability.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `event` to `recipient`.
    async fn notify(&self, recipient: &str, event: &SecurityEvent) -> Result<(), NotifyError>;
}

/// Emits notifications as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, event: &SecurityEvent) -> Result<(), NotifyError> {
        match event {
            SecurityEvent::NewOrigin {
                subject,
                previous_origin,
                new_origin,
            } => warn!(
                event_type = event.kind(),
                recipient = %recipient,
                subject = %subject,
                previous_origin = %previous_origin,
                new_origin = %new_origin,
                "{}",
                event.subject_line()
            ),
        }
        Ok(())
    }
}

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Recipient address
    pub recipient: String,
    /// Event delivered
    pub event: SecurityEvent,
}

/// Records deliveries in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl MemoryNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Number of deliveries.
    pub async fn count(&self) -> usize {
        self.deliveries.lock().await.len()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, recipient: &str, event: &SecurityEvent) -> Result<(), NotifyError> {
        self.deliveries.lock().await.push(Delivery {
            recipient: recipient.to_string(),
            event: event.clone(),
        });
        Ok(())
    }
}
