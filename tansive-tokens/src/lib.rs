//! EdDSA identity token minting/validation and the active signing-key cache.
//!
//! Tokens are JWT-shaped (base64url `header.claims.signature`) but validated against a
//! `kid`-addressed Ed25519 key looked up through the [`store::SigningKeyStore`] contract, so
//! key rotation and multi-key validation work without a single shared HMAC secret.

pub mod clock;
pub mod service;
pub mod store;
pub mod token;

pub use clock::{FixedClock, SystemClock, TokenClock};
pub use service::{CachedKey, MintedToken, SigningKeyCache, TokenService, ValidatedClaims};
pub use store::{SigningKeyRecord, SigningKeyStore};
pub use token::RESERVED_CLAIMS;
