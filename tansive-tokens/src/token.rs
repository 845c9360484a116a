//! Compact token encoding: JWT-shaped (base64url header.payload.signature) but hand-verified
//! against the active/`kid`-addressed Ed25519 key rather than delegated to a single-secret JWT
//! library, since `kid`-based multi-key validation under rotation doesn't fit that model.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tansive_core::{SigningKeyId, TokenError};

/// Reserved claim names the token service populates and never lets a caller override.
pub const RESERVED_CLAIMS: &[&str] = &["tenant_id", "iss", "iat", "exp", "nbf", "aud", "jti", "ver"];

/// Token protocol version.
pub const TOKEN_VERSION: &str = "0.1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub kid: String,
}

/// The decoded, but not yet time/signature-validated, parts of a token.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub claims: serde_json::Map<String, Value>,
    signing_input: String,
    signature: Signature,
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unb64(s: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| TokenError::Malformed { reason: e.to_string() })
}

/// Encode a token: `base64url(header_json).base64url(claims_json).base64url(signature)`.
pub fn encode(kid: &SigningKeyId, claims: &serde_json::Map<String, Value>, signing_key: &SigningKey) -> String {
    let header = TokenHeader { alg: "EdDSA".to_string(), kid: kid.to_string() };
    let header_part = b64(&serde_json::to_vec(&header).expect("header serializes"));
    let claims_part = b64(&serde_json::to_vec(claims).expect("claims serialize"));
    let signing_input = format!("{header_part}.{claims_part}");
    let signature = signing_key.sign(signing_input.as_bytes());
    format!("{signing_input}.{}", b64(&signature.to_bytes()))
}

/// Split and base64-decode a token into its structural parts, without verifying the signature.
pub fn decode_unverified(token: &str) -> Result<DecodedToken, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed { reason: "token must have 3 dot-separated parts".into() });
    }

    let header_bytes = unb64(parts[0])?;
    let header: TokenHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| TokenError::Malformed { reason: format!("invalid header: {e}") })?;

    let claims_bytes = unb64(parts[1])?;
    let claims: serde_json::Map<String, Value> = serde_json::from_slice(&claims_bytes)
        .map_err(|e| TokenError::Malformed { reason: format!("invalid claims: {e}") })?;

    let sig_bytes = unb64(parts[2])?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| TokenError::Malformed { reason: "signature must be 64 bytes".into() })?;
    let signature = Signature::from_bytes(&sig_array);

    Ok(DecodedToken {
        header,
        claims,
        signing_input: format!("{}.{}", parts[0], parts[1]),
        signature,
    })
}

impl DecodedToken {
    /// Verify the signature against `public_key`.
    pub fn verify(&self, public_key: &VerifyingKey) -> Result<(), TokenError> {
        public_key
            .verify(self.signing_input.as_bytes(), &self.signature)
            .map_err(|_| TokenError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey as SK;
    use rand::rngs::OsRng;
    use serde_json::json;

    #[test]
    fn round_trip_encodes_and_verifies() {
        let signing_key = SK::generate(&mut OsRng);
        let kid = SigningKeyId::new_v4();
        use tansive_core::EntityIdType;
        let mut claims = serde_json::Map::new();
        claims.insert("tenant_id".into(), json!("t1"));

        let token = encode(&kid, &claims, &signing_key);
        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.header.kid, kid.to_string());
        decoded.verify(&signing_key.verifying_key()).unwrap();
    }

    #[test]
    fn tampered_signature_fails_verification() {
        use tansive_core::EntityIdType;
        let signing_key = SK::generate(&mut OsRng);
        let kid = SigningKeyId::new_v4();
        let claims = serde_json::Map::new();
        let mut token = encode(&kid, &claims, &signing_key);
        token.push('x');
        let decoded = decode_unverified(&token).unwrap();
        assert!(decoded.verify(&signing_key.verifying_key()).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(decode_unverified("not-a-token").is_err());
    }
}
