//! Signing-key persistence contract.
//!
//! The token service needs somewhere to keep the active Ed25519 keypair (public half in the
//! clear, private half encrypted via `tansive-crypto`). This crate only defines the contract;
//! `tansive-catalog` provides the in-memory implementation used by the server and tests.

use async_trait::async_trait;
use tansive_core::{SigningKeyId, TenantId, TokenError};

/// A persisted signing key row. At most one row per tenant has `is_active = true`.
#[derive(Debug, Clone)]
pub struct SigningKeyRecord {
    pub key_id: SigningKeyId,
    pub public_key: [u8; 32],
    pub encrypted_private_key: Vec<u8>,
    pub is_active: bool,
}

/// Storage contract for Ed25519 signing keys, scoped per tenant.
#[async_trait]
pub trait SigningKeyStore: Send + Sync {
    /// Return the active key for `tenant`, if one exists.
    async fn active_key(&self, tenant: TenantId) -> Result<Option<SigningKeyRecord>, TokenError>;

    /// Look up a specific key by id, active or not (used during validation by `kid`).
    async fn get_key(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<Option<SigningKeyRecord>, TokenError>;

    /// Insert a newly generated key. Implementations must not mark it active implicitly; callers
    /// call `activate` explicitly so there is always a well-defined moment of rotation.
    async fn insert_key(&self, tenant: TenantId, record: SigningKeyRecord) -> Result<(), TokenError>;

    /// Atomically mark `key_id` active and every other key for `tenant` inactive.
    async fn activate_key(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<(), TokenError>;
}
