//! HS512 access tokens.

pub mod claims;
pub mod signer;

pub use claims::AccessClaims;
pub use signer::{AccessToken, TokenSigner};
