//! Salted, iterated one-way fingerprints of refresh credentials.
//!
//! PBKDF2-HMAC-SHA256 keyed by a process-wide salt. The derivation is
//! deterministic so a presented credential can be looked up directly, and the
//! iteration count makes enumerating a leaked store expensive.

use crate::error::SessionError;
use crate::refresh::credential::RefreshCredential;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::pbkdf2;
use std::fmt;
use std::num::NonZeroU32;
use zeroize::Zeroizing;

const FINGERPRINT_LEN: usize = 32;

/// Stored representation of a refresh credential.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Storage key form (base64url, no padding).
    #[must_use]
    pub fn to_key(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.to_key();
        write!(f, "Fingerprint({}..)", &key[..8])
    }
}

/// Derives fingerprints with a fixed salt and iteration count.
pub struct Fingerprinter {
    salt: Zeroizing<Vec<u8>>,
    iterations: NonZeroU32,
}

impl Fingerprinter {
    /// # Errors
    ///
    /// Returns a configuration error for an empty salt or zero iterations.
    pub fn new(salt: &[u8], iterations: u32) -> Result<Self, SessionError> {
        if salt.is_empty() {
            return Err(SessionError::config("Fingerprint salt must not be empty"));
        }
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| SessionError::config("Fingerprint iterations must be non-zero"))?;

        Ok(Self {
            salt: Zeroizing::new(salt.to_vec()),
            iterations,
        })
    }

    /// Derive the fingerprint of `credential`. CPU-bound; call from a
    /// blocking context on hot paths.
    #[must_use]
    pub fn fingerprint(&self, credential: &RefreshCredential) -> Fingerprint {
        let mut out = [0u8; FINGERPRINT_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &self.salt,
            credential.as_bytes(),
            &mut out,
        );
        Fingerprint(out)
    }
}

impl fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}
