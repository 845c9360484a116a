//! Hash-chained log entry and its canonical encodings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tansive_core::HashlogError;

/// A single line of the hashlog: the caller's payload, the previous entry's hash, this entry's
/// hash, and an Ed25519 signature over all three.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedLogEntry {
    pub payload: Value,
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    pub hash: String,
    pub signature: String,
}

/// Canonical two-field struct whose serialization order is fixed (payload, then prevHash) —
/// this is the "canonical JSON" the hash is computed over.
#[derive(Serialize)]
struct HashInput<'a> {
    payload: &'a Value,
    #[serde(rename = "prevHash")]
    prev_hash: &'a str,
}

/// Canonical three-field struct the signature is computed over.
#[derive(Serialize)]
struct SignInput<'a> {
    payload: &'a Value,
    #[serde(rename = "prevHash")]
    prev_hash: &'a str,
    hash: &'a str,
}

fn compute_hash(payload: &Value, prev_hash: &str) -> String {
    let canonical = serde_json::to_vec(&HashInput { payload, prev_hash }).expect("canonical json always serializes");
    let digest = Sha256::digest(&canonical);
    hex::encode(digest)
}

fn signing_bytes(payload: &Value, prev_hash: &str, hash: &str) -> Vec<u8> {
    serde_json::to_vec(&SignInput { payload, prev_hash, hash }).expect("canonical json always serializes")
}

impl HashedLogEntry {
    /// Build and sign a new entry chained onto `prev_hash`.
    pub fn seal(payload: Value, prev_hash: &str, signing_key: &SigningKey) -> Self {
        let hash = compute_hash(&payload, prev_hash);
        let signature = signing_key.sign(&signing_bytes(&payload, prev_hash, &hash));
        Self {
            payload,
            prev_hash: prev_hash.to_string(),
            hash,
            signature: BASE64.encode(signature.to_bytes()),
        }
    }

    /// Recompute this entry's hash from its payload and claimed `prevHash`.
    pub fn recompute_hash(&self) -> String {
        compute_hash(&self.payload, &self.prev_hash)
    }

    /// Verify the signature against `public_key`, using the entry's own claimed `hash`.
    pub fn verify_signature(&self, public_key: &VerifyingKey) -> Result<(), HashlogError> {
        let sig_bytes = BASE64
            .decode(&self.signature)
            .map_err(|e| HashlogError::MalformedEntry { line: 0, reason: format!("bad signature base64: {e}") })?;
        let sig_array: [u8; 64] = sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashlogError::MalformedEntry { line: 0, reason: "signature must be 64 bytes".into() })?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_array);
        public_key
            .verify(&signing_bytes(&self.payload, &self.prev_hash, &self.hash), &signature)
            .map_err(|_| HashlogError::SignatureInvalid { line: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use serde_json::json;

    #[test]
    fn seal_then_verify_round_trips() {
        let key = SigningKey::generate(&mut OsRng);
        let entry = HashedLogEntry::seal(json!({"i": 0}), "", &key);
        assert_eq!(entry.hash, entry.recompute_hash());
        entry.verify_signature(&key.verifying_key()).unwrap();
    }

    #[test]
    fn tampered_hash_fails_signature_check() {
        let key = SigningKey::generate(&mut OsRng);
        let mut entry = HashedLogEntry::seal(json!({"i": 0}), "", &key);
        entry.hash = "00".repeat(32);
        assert!(entry.verify_signature(&key.verifying_key()).is_err());
    }
}
