//! Session token service library.
//!
//! Issues signed access tokens paired with single-use refresh credentials,
//! rotates the pair on every refresh, and notifies the user when a refresh
//! arrives from a network origin other than the one the credential was
//! issued to.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod metrics;
pub mod notify;
pub mod refresh;
pub mod service;
pub mod storage;
pub mod telemetry;

// Re-exports for convenience
pub use config::Config;
pub use error::{ErrorKind, SessionError};
pub use service::{SessionIssuer, Tokens};
