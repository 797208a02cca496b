//! Refresh credential issuance and rotation.

pub mod credential;
pub mod fingerprint;
pub mod rotator;

pub use credential::{RefreshCredential, CREDENTIAL_LEN};
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use rotator::{IssuedCredential, Redemption, RefreshRotator};
