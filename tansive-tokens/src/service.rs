//! Token service: active signing-key cache plus mint/validate operations.

use crate::clock::TokenClock;
use crate::store::{SigningKeyRecord, SigningKeyStore};
use crate::token::{self, RESERVED_CLAIMS, TOKEN_VERSION};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde_json::{json, Value};
use std::sync::Arc;
use tansive_core::{ClaimMap, EntityIdType, SigningKeyId, TenantId, TokenError};
use tokio::sync::RwLock;

/// A decrypted, cached signing keypair plus its `kid`.
pub struct CachedKey {
    pub key_id: SigningKeyId,
    pub signing_key: SigningKey,
}

/// Process-wide active signing key cache: one-shot lazy load, lock-free reads once populated.
pub struct SigningKeyCache {
    store: Arc<dyn SigningKeyStore>,
    password: String,
    cached: RwLock<Option<Arc<CachedKey>>>,
}

impl SigningKeyCache {
    pub fn new(store: Arc<dyn SigningKeyStore>, password: impl Into<String>) -> Self {
        Self { store, password: password.into(), cached: RwLock::new(None) }
    }

    /// Return the active key, generating and persisting a new one on first use if none exists.
    pub async fn get_or_init(&self, tenant: TenantId) -> Result<Arc<CachedKey>, TokenError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut guard = self.cached.write().await;
        if let Some(cached) = guard.as_ref() {
            return Ok(cached.clone());
        }

        let record = match self.store.active_key(tenant).await? {
            Some(record) => record,
            None => self.generate_and_store(tenant).await?,
        };

        let cached = Arc::new(self.decrypt_record(&record)?);
        *guard = Some(cached.clone());
        Ok(cached)
    }

    /// Force a rotation: generate a fresh keypair, persist it, mark it active, and refresh the
    /// cache so the next call observes it.
    pub async fn rotate(&self, tenant: TenantId) -> Result<Arc<CachedKey>, TokenError> {
        let record = self.generate_and_store(tenant).await?;
        let cached = Arc::new(self.decrypt_record(&record)?);
        let mut guard = self.cached.write().await;
        *guard = Some(cached.clone());
        Ok(cached)
    }

    /// Look up a (possibly non-active) key by id, used to validate tokens signed under a key
    /// that has since been rotated out.
    pub async fn lookup(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<VerifyingKey, TokenError> {
        let record = self
            .store
            .get_key(tenant, key_id)
            .await?
            .ok_or(TokenError::UnknownKey { kid: key_id.to_string() })?;
        VerifyingKey::from_bytes(&record.public_key).map_err(|e| TokenError::Malformed { reason: e.to_string() })
    }

    async fn generate_and_store(&self, tenant: TenantId) -> Result<SigningKeyRecord, TokenError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let key_id = SigningKeyId::new_v4();
        let encrypted_private_key = tansive_crypto::encrypt(signing_key.to_bytes().as_slice(), &self.password)
            .map_err(|e| TokenError::Malformed { reason: e.to_string() })?;
        let record = SigningKeyRecord {
            key_id,
            public_key: signing_key.verifying_key().to_bytes(),
            encrypted_private_key,
            is_active: true,
        };
        self.store.insert_key(tenant, record.clone()).await?;
        self.store.activate_key(tenant, key_id).await?;
        Ok(record)
    }

    fn decrypt_record(&self, record: &SigningKeyRecord) -> Result<CachedKey, TokenError> {
        let plaintext = tansive_crypto::decrypt(&record.encrypted_private_key, &self.password)
            .map_err(|e| TokenError::Malformed { reason: e.to_string() })?;
        let bytes: [u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| TokenError::Malformed { reason: "private key must be 32 bytes".into() })?;
        Ok(CachedKey { key_id: record.key_id, signing_key: SigningKey::from_bytes(&bytes) })
    }
}

/// A validated token's claims, post signature/time checks.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    pub tenant_id: TenantId,
    pub jti: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub claims: ClaimMap,
}

/// Outcome of minting a token.
pub struct MintedToken {
    pub token: String,
    pub expires_at: tansive_core::Timestamp,
}

/// Mints and validates identity tokens bound to the process-wide active signing key.
pub struct TokenService {
    cache: Arc<SigningKeyCache>,
    clock: Arc<dyn TokenClock>,
    issuer: String,
    lifetime_secs: i64,
}

impl TokenService {
    pub fn new(cache: Arc<SigningKeyCache>, clock: Arc<dyn TokenClock>, issuer: impl Into<String>, lifetime_secs: i64) -> Self {
        Self { cache, clock, issuer: issuer.into(), lifetime_secs }
    }

    /// Mint an identity token bound to `tenant`, with `additional_claims` merged in.
    ///
    /// Any key in `additional_claims` that collides with a reserved claim name is dropped and a
    /// warning logged; it is never allowed to override the server-populated value.
    pub async fn mint(&self, tenant: TenantId, mut additional_claims: ClaimMap) -> Result<MintedToken, TokenError> {
        let overridden = additional_claims.reserved(RESERVED_CLAIMS);
        if !overridden.is_empty() {
            tracing::warn!(?overridden, "caller attempted to override reserved token claims; dropping");
            additional_claims.strip_reserved(RESERVED_CLAIMS);
        }

        let cached = self.cache.get_or_init(tenant).await?;
        let now = self.clock.now_epoch_secs();
        let exp = now + self.lifetime_secs;
        let nbf = now - 120;

        let mut map = serde_json::Map::new();
        for (k, v) in additional_claims.iter() {
            map.insert(k.clone(), v.clone());
        }
        map.insert("tenant_id".into(), json!(tenant.to_string()));
        map.insert("iss".into(), json!(self.issuer));
        map.insert("iat".into(), json!(now));
        map.insert("exp".into(), json!(exp));
        map.insert("nbf".into(), json!(nbf));
        map.insert("aud".into(), json!(["tansivesrv"]));
        map.insert("jti".into(), json!(uuid::Uuid::new_v4().to_string()));
        map.insert("ver".into(), json!(TOKEN_VERSION));

        let token = token::encode(&cached.key_id, &map, &cached.signing_key);
        let expires_at = chrono::DateTime::from_timestamp(exp, 0).unwrap_or_else(chrono::Utc::now);
        Ok(MintedToken { token, expires_at })
    }

    /// Validate a token: parses, looks up `kid`, verifies the signature, checks `exp`/`nbf`.
    pub async fn validate(&self, tenant: TenantId, token_str: &str) -> Result<ValidatedClaims, TokenError> {
        let decoded = token::decode_unverified(token_str)?;
        let kid: SigningKeyId = decoded
            .header
            .kid
            .parse()
            .map_err(|_| TokenError::Malformed { reason: "kid is not a valid key id".into() })?;
        let public_key = self.cache.lookup(tenant, kid).await?;
        decoded.verify(&public_key)?;

        let now = self.clock.now_epoch_secs();
        let exp = claim_i64(&decoded.claims, "exp")?;
        let nbf = claim_i64(&decoded.claims, "nbf")?;
        if now >= exp {
            return Err(TokenError::Expired);
        }
        if now < nbf {
            return Err(TokenError::NotYetValid);
        }

        let jti = decoded
            .claims
            .get("jti")
            .and_then(Value::as_str)
            .ok_or_else(|| TokenError::Malformed { reason: "missing jti".into() })?
            .to_string();
        let iat = claim_i64(&decoded.claims, "iat")?;

        let mut claim_map = ClaimMap::new();
        for (k, v) in decoded.claims.iter() {
            claim_map.insert(k.clone(), v.clone());
        }

        Ok(ValidatedClaims { tenant_id: tenant, jti, issued_at: iat, expires_at: exp, claims: claim_map })
    }
}

fn claim_i64(claims: &serde_json::Map<String, Value>, key: &str) -> Result<i64, TokenError> {
    claims
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| TokenError::Malformed { reason: format!("missing or non-integer claim '{key}'") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct InMemoryKeyStore {
        keys: TokioMutex<HashMap<(TenantId, SigningKeyId), SigningKeyRecord>>,
        active: TokioMutex<HashMap<TenantId, SigningKeyId>>,
    }

    #[async_trait]
    impl SigningKeyStore for InMemoryKeyStore {
        async fn active_key(&self, tenant: TenantId) -> Result<Option<SigningKeyRecord>, TokenError> {
            let active = self.active.lock().await;
            let keys = self.keys.lock().await;
            Ok(active.get(&tenant).and_then(|kid| keys.get(&(tenant, *kid)).cloned()))
        }

        async fn get_key(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<Option<SigningKeyRecord>, TokenError> {
            Ok(self.keys.lock().await.get(&(tenant, key_id)).cloned())
        }

        async fn insert_key(&self, tenant: TenantId, record: SigningKeyRecord) -> Result<(), TokenError> {
            self.keys.lock().await.insert((tenant, record.key_id), record);
            Ok(())
        }

        async fn activate_key(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<(), TokenError> {
            self.active.lock().await.insert(tenant, key_id);
            Ok(())
        }
    }

    fn service(now: i64) -> (TokenService, Arc<SigningKeyCache>) {
        let store = Arc::new(InMemoryKeyStore::default());
        let cache = Arc::new(SigningKeyCache::new(store, "test-master-password"));
        let clock = Arc::new(FixedClock(now));
        (TokenService::new(cache.clone(), clock, "localhost:8080", 3600), cache)
    }

    #[tokio::test]
    async fn mint_then_validate_round_trips_claims() {
        let (svc, _cache) = service(1_700_000_000);
        let tenant = TenantId::new_v4();
        let mut claims = ClaimMap::new();
        claims.insert("scope", json!({"catalog": "valid-catalog"}));

        let minted = svc.mint(tenant, claims).await.unwrap();
        let validated = svc.validate(tenant, &minted.token).await.unwrap();
        assert_eq!(validated.claims.get("scope").unwrap()["catalog"], "valid-catalog");
        assert_eq!(validated.tenant_id, tenant);
    }

    #[tokio::test]
    async fn reserved_claims_cannot_be_overridden() {
        let (svc, _cache) = service(1_700_000_000);
        let tenant = TenantId::new_v4();
        let mut claims = ClaimMap::new();
        claims.insert("iss", json!("attacker.example"));

        let minted = svc.mint(tenant, claims).await.unwrap();
        let validated = svc.validate(tenant, &minted.token).await.unwrap();
        assert_eq!(validated.claims.get("iss").unwrap(), "localhost:8080");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (svc, _cache) = service(1_700_000_000);
        let tenant = TenantId::new_v4();
        let minted = svc.mint(tenant, ClaimMap::new()).await.unwrap();

        let far_future = Arc::new(FixedClock(1_700_000_000 + 7200));
        let svc2 = TokenService { cache: svc.cache.clone(), clock: far_future, issuer: svc.issuer.clone(), lifetime_secs: 3600 };
        assert_eq!(svc2.validate(tenant, &minted.token).await.unwrap_err(), TokenError::Expired);
    }

    #[tokio::test]
    async fn token_before_nbf_is_rejected() {
        let (svc, _cache) = service(1_700_000_000);
        let tenant = TenantId::new_v4();
        let minted = svc.mint(tenant, ClaimMap::new()).await.unwrap();

        let before_nbf = Arc::new(FixedClock(1_700_000_000 - 300));
        let svc2 = TokenService { cache: svc.cache.clone(), clock: before_nbf, issuer: svc.issuer.clone(), lifetime_secs: 3600 };
        assert_eq!(svc2.validate(tenant, &minted.token).await.unwrap_err(), TokenError::NotYetValid);
    }

    #[tokio::test]
    async fn rotation_invalidates_nothing_retroactively_but_changes_active_kid() {
        let (svc, cache) = service(1_700_000_000);
        let tenant = TenantId::new_v4();
        let first = svc.mint(tenant, ClaimMap::new()).await.unwrap();
        let first_key = cache.get_or_init(tenant).await.unwrap().key_id;

        cache.rotate(tenant).await.unwrap();
        let second_key = cache.get_or_init(tenant).await.unwrap().key_id;
        assert_ne!(first_key, second_key);

        // token signed under the old key still validates because its kid is looked up directly.
        let validated = svc.validate(tenant, &first.token).await.unwrap();
        assert_eq!(validated.tenant_id, tenant);
    }
}
