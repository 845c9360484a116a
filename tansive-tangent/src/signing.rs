//! Client-side request signing for Tangent → Catalog Server calls.
//!
//! The inverse of `tansive_server::tangent_auth::TangentAuth`: that extractor rebuilds the same
//! canonical string and verifies it against a registered public key, so this module must produce
//! byte-for-byte the same string on the signing side — method, raw path, raw query, raw body,
//! timestamp, newline-joined.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey};

/// `X-TangentID`, `X-Tangent-Signature-Timestamp`, `X-Tangent-Signature` for one outgoing request.
pub struct SignedHeaders {
    pub tangent_id: String,
    pub timestamp: String,
    pub signature: String,
}

/// A tangent's identity and signing key for CS-bound requests.
pub struct TangentIdentity {
    pub tangent_id: String,
    pub signing_key: SigningKey,
}

impl TangentIdentity {
    pub fn from_hex(tangent_id: impl Into<String>, private_key_hex: &str) -> Result<Self, String> {
        let bytes = hex::decode(private_key_hex).map_err(|e| format!("signing key is not valid hex: {e}"))?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| "signing key must be 32 bytes".to_string())?;
        Ok(Self { tangent_id: tangent_id.into(), signing_key: SigningKey::from_bytes(&array) })
    }

    /// Sign `method`/`path`/`query`/`body` for "now" and return the headers to attach.
    ///
    /// `path` must already start with `/`; normalize on the caller side so it matches the
    /// server's `parts.uri.path()` exactly. `body` must be the exact bytes sent on the wire —
    /// the server recomputes the canonical string from the bytes it actually received.
    pub fn sign(&self, method: &str, path: &str, query: Option<&str>, body: &[u8]) -> SignedHeaders {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let mut canonical = Vec::with_capacity(body.len() + method.len() + path.len() + 64);
        canonical.extend_from_slice(method.as_bytes());
        canonical.push(b'\n');
        canonical.extend_from_slice(path.as_bytes());
        canonical.push(b'\n');
        canonical.extend_from_slice(query.unwrap_or("").as_bytes());
        canonical.push(b'\n');
        canonical.extend_from_slice(body);
        canonical.push(b'\n');
        canonical.extend_from_slice(timestamp.as_bytes());
        let signature = self.signing_key.sign(&canonical);
        SignedHeaders {
            tangent_id: self.tangent_id.clone(),
            timestamp,
            signature: BASE64URL.encode(signature.to_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    #[test]
    fn signed_canonical_string_verifies_against_the_public_key() {
        let key_bytes = [7u8; 32];
        let identity = TangentIdentity::from_hex("tg-1", &hex::encode(key_bytes)).unwrap();
        let body = br#"{"session_id":"s1"}"#;
        let headers = identity.sign("POST", "/sessions/execution-state", None, body);

        let canonical = format!("POST\n/sessions/execution-state\n\n{}\n{}", std::str::from_utf8(body).unwrap(), headers.timestamp);
        let verifying_key = VerifyingKey::from(&identity.signing_key);
        let sig_bytes: [u8; 64] = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(&headers.signature).unwrap().try_into().unwrap();
        verifying_key.verify(canonical.as_bytes(), &Signature::from_bytes(&sig_bytes)).unwrap();
    }

    #[test]
    fn timestamp_header_is_rfc3339() {
        let identity = TangentIdentity::from_hex("tg-1", &hex::encode([7u8; 32])).unwrap();
        let headers = identity.sign("POST", "/sessions/execution-state", None, b"{}");
        chrono::DateTime::parse_from_rfc3339(&headers.timestamp).expect("timestamp must be RFC3339");
    }
}
