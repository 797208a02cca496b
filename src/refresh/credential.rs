//! Refresh credential wire type.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw credential length in bytes.
pub const CREDENTIAL_LEN: usize = 32;

/// Opaque refresh secret. Only its fingerprint is ever stored.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RefreshCredential([u8; CREDENTIAL_LEN]);

impl RefreshCredential {
    /// Fresh credential from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CREDENTIAL_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        RefreshCredential(bytes)
    }

    /// Parse the transport encoding. `None` for anything that is not
    /// base64url of exactly [`CREDENTIAL_LEN`] bytes.
    pub fn decode(encoded: &str) -> Option<Self> {
        let mut decoded = URL_SAFE_NO_PAD.decode(encoded.trim()).ok()?;
        let credential = <[u8; CREDENTIAL_LEN]>::try_from(decoded.as_slice())
            .ok()
            .map(RefreshCredential);
        decoded.zeroize();
        credential
    }

    /// Transport encoding (base64url, no padding).
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshCredential([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_credentials() {
        let a = RefreshCredential::generate();
        let b = RefreshCredential::generate();
        assert_ne!(a, b);
        assert_eq!(a.encode().len(), 43); // Base64 encoded 32 bytes
    }

    #[test]
    fn test_decode_encoded() {
        let credential = RefreshCredential::generate();
        let decoded = RefreshCredential::decode(&credential.encode()).unwrap();
        assert_eq!(credential, decoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(RefreshCredential::decode("").is_none());
        assert!(RefreshCredential::decode("not base64 !!").is_none());
        // valid base64url, wrong length
        assert!(RefreshCredential::decode(&URL_SAFE_NO_PAD.encode([7u8; 16])).is_none());
        // standard alphabet with padding is not the transport encoding
        assert!(RefreshCredential::decode(&base64::engine::general_purpose::STANDARD.encode([0xfbu8; 32])).is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let credential = RefreshCredential::generate();
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains(&credential.encode()));
        assert!(rendered.contains("REDACTED"));
    }
}
