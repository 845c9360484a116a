//! Single-use PKCE-style auth-code table handing a running session off from the catalog server
//! to its tangent without shipping a long-lived credential.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine as _;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tansive_core::{CatalogId, SessionError, TenantId, Timestamp, ViewId};

/// Entry stored against a freshly generated auth code, keyed out of band by the code itself.
#[derive(Debug, Clone)]
pub struct AuthCodeEntry {
    pub session_id: uuid::Uuid,
    pub tenant_id: TenantId,
    pub catalog_id: CatalogId,
    pub view_id: ViewId,
    pub code_challenge: String,
    pub expires_at: Timestamp,
}

/// Length in bytes of a generated auth code, before URL-safe base64 encoding.
const CODE_BYTES: usize = 32;

/// Default handoff window: the auth code must be redeemed within this many minutes of issuance.
pub const DEFAULT_TTL_MINUTES: i64 = 10;

fn challenge_from_verifier(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    BASE64URL.encode(digest)
}

/// Process-wide, mutex-guarded map of outstanding auth codes. Redemption is lookup-and-delete
/// under a single lock so a code can never be redeemed twice, even concurrently.
#[derive(Default)]
pub struct AuthCodeTable {
    entries: Mutex<HashMap<String, AuthCodeEntry>>,
}

impl AuthCodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh URL-safe 32-byte code and register `entry` under it.
    pub fn issue(&self, entry: AuthCodeEntry) -> String {
        let mut bytes = [0u8; CODE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let code = BASE64URL.encode(bytes);
        self.entries.lock().insert(code.clone(), entry);
        code
    }

    /// Redeem `code` with `verifier`. Single-use: the entry is removed regardless of outcome.
    pub fn redeem(&self, code: &str, verifier: &str, now: Timestamp) -> Result<AuthCodeEntry, SessionError> {
        let entry = self
            .entries
            .lock()
            .remove(code)
            .ok_or(SessionError::InvalidAuthCode)?;

        if now > entry.expires_at {
            return Err(SessionError::AuthCodeExpired);
        }
        if challenge_from_verifier(verifier) != entry.code_challenge {
            return Err(SessionError::AuthCodeVerifierMismatch);
        }
        Ok(entry)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tansive_core::EntityIdType;

    fn entry(challenge: &str, ttl_mins: i64) -> AuthCodeEntry {
        AuthCodeEntry {
            session_id: uuid::Uuid::new_v4(),
            tenant_id: TenantId::new_v4(),
            catalog_id: CatalogId::new_v4(),
            view_id: ViewId::new_v4(),
            code_challenge: challenge.to_string(),
            expires_at: chrono::Utc::now() + chrono::Duration::minutes(ttl_mins),
        }
    }

    #[test]
    fn redeem_succeeds_exactly_once() {
        let table = AuthCodeTable::new();
        let verifier = "a".repeat(64);
        let challenge = challenge_from_verifier(&verifier);
        let code = table.issue(entry(&challenge, DEFAULT_TTL_MINUTES));

        assert!(table.redeem(&code, &verifier, chrono::Utc::now()).is_ok());
        assert_eq!(
            table.redeem(&code, &verifier, chrono::Utc::now()).unwrap_err(),
            SessionError::InvalidAuthCode
        );
    }

    #[test]
    fn mismatched_verifier_fails_and_consumes_code() {
        let table = AuthCodeTable::new();
        let challenge = challenge_from_verifier(&"a".repeat(64));
        let code = table.issue(entry(&challenge, DEFAULT_TTL_MINUTES));

        let err = table.redeem(&code, &"b".repeat(64), chrono::Utc::now()).unwrap_err();
        assert_eq!(err, SessionError::AuthCodeVerifierMismatch);
        assert_eq!(table.len(), 0);
        assert_eq!(
            table.redeem(&code, &"a".repeat(64), chrono::Utc::now()).unwrap_err(),
            SessionError::InvalidAuthCode
        );
    }

    #[test]
    fn expired_code_fails() {
        let table = AuthCodeTable::new();
        let verifier = "a".repeat(64);
        let challenge = challenge_from_verifier(&verifier);
        let code = table.issue(entry(&challenge, -1));

        let err = table.redeem(&code, &verifier, chrono::Utc::now()).unwrap_err();
        assert_eq!(err, SessionError::AuthCodeExpired);
    }
}
