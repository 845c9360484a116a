//! Argon2id key derivation and AEAD-encrypted secret blob framing.
//!
//! This crate protects a single small secret at rest — in practice the active Ed25519 token
//! signing key's private half (see `tansive-tokens`) — behind a password-derived symmetric key.
//! The binary framing is versioned so a future parameter or algorithm change can introduce a new
//! version byte without breaking blobs already on disk.

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroize;

pub use tansive_core::CryptoError;

/// Version byte identifying this exact parameter/algorithm combination
/// (Argon2id, memory=65536 KiB, iterations=3, parallelism=1; XChaCha20-Poly1305).
pub const BLOB_VERSION: u8 = 0x01;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Argon2id memory cost in KiB. 65536 KiB = 64 MiB, matching the documented floor exactly.
const ARGON2_MEMORY_KIB: u32 = 65536;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;

fn argon2_params() -> argon2::Params {
    argon2::Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, Some(KEY_LEN))
        .expect("static Argon2id parameters are valid")
}

/// Derive a 32-byte key from `password` and `salt` using Argon2id.
fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<[u8; KEY_LEN], CryptoError> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, argon2_params());
    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivationFailed { reason: e.to_string() })?;
    Ok(key)
}

/// Encrypt `plaintext` under `password`, returning the framed blob:
/// `[1 byte version][16 bytes salt][24 bytes nonce][ciphertext][16 bytes tag]`.
///
/// Empty plaintext is rejected.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let mut key = derive_key(password.as_bytes(), &salt)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key).map_err(|e| CryptoError::KeyDerivationFailed {
        reason: e.to_string(),
    })?;
    key.zeroize();

    let nonce = XNonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let mut blob = Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]. Any tampering (version, salt, nonce, ciphertext, or
/// tag) causes `CryptoError::DecryptionFailed` or `CryptoError::MalformedBlob` — never partial
/// output.
pub fn decrypt(blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let min_len = 1 + SALT_LEN + NONCE_LEN + TAG_LEN;
    if blob.len() < min_len {
        return Err(CryptoError::MalformedBlob {
            reason: format!("blob too short: {} bytes, need at least {}", blob.len(), min_len),
        });
    }

    let version = blob[0];
    if version != BLOB_VERSION {
        return Err(CryptoError::UnsupportedVersion { version });
    }

    let salt: [u8; SALT_LEN] = blob[1..1 + SALT_LEN].try_into().unwrap();
    let nonce_bytes = &blob[1 + SALT_LEN..1 + SALT_LEN + NONCE_LEN];
    let ciphertext = &blob[1 + SALT_LEN + NONCE_LEN..];

    let mut key = derive_key(password.as_bytes(), &salt)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key).map_err(|e| CryptoError::KeyDerivationFailed {
        reason: e.to_string(),
    })?;
    key.zeroize();

    let nonce = XNonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_recovers_plaintext() {
        let blob = encrypt(b"super secret key material", "correct horse battery staple").unwrap();
        let recovered = decrypt(&blob, "correct horse battery staple").unwrap();
        assert_eq!(recovered, b"super secret key material");
    }

    #[test]
    fn wrong_password_fails_to_decrypt() {
        let blob = encrypt(b"payload", "right-password").unwrap();
        let err = decrypt(&blob, "wrong-password").unwrap_err();
        assert_eq!(err, CryptoError::DecryptionFailed);
    }

    #[test]
    fn empty_plaintext_is_rejected() {
        let err = encrypt(b"", "pw").unwrap_err();
        assert_eq!(err, CryptoError::EmptyPlaintext);
    }

    #[test]
    fn tampering_with_ciphertext_byte_fails_decrypt() {
        let mut blob = encrypt(b"payload data", "pw").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert_eq!(decrypt(&blob, "pw").unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn tampering_with_salt_fails_decrypt() {
        let mut blob = encrypt(b"payload data", "pw").unwrap();
        blob[1] ^= 0x01;
        assert_eq!(decrypt(&blob, "pw").unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn tampering_with_nonce_fails_decrypt() {
        let mut blob = encrypt(b"payload data", "pw").unwrap();
        blob[1 + SALT_LEN] ^= 0x01;
        assert_eq!(decrypt(&blob, "pw").unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut blob = encrypt(b"payload data", "pw").unwrap();
        blob[0] = 0x02;
        assert_eq!(decrypt(&blob, "pw").unwrap_err(), CryptoError::UnsupportedVersion { version: 0x02 });
    }

    #[test]
    fn truncated_blob_is_malformed() {
        let blob = vec![BLOB_VERSION, 1, 2, 3];
        assert!(matches!(decrypt(&blob, "pw"), Err(CryptoError::MalformedBlob { .. })));
    }

    #[test]
    fn different_passwords_produce_different_ciphertexts() {
        let a = encrypt(b"same plaintext", "pw-a").unwrap();
        let b = encrypt(b"same plaintext", "pw-b").unwrap();
        assert_ne!(a, b);
    }
}
