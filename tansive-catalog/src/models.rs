//! Row types for the catalog/session repository contract.

use serde::{Deserialize, Serialize};
use tansive_core::{CatalogId, ProjectId, SessionId, TangentId, TenantId, Timestamp, VariantId, ViewId};
use tansive_policy::ViewDef;
use uuid::Uuid;

/// Identifier for a schema directory (one of a variant's two: resources or skillsets).
pub type DirectoryId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub tenant_id: TenantId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: CatalogId,
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub info: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub catalog_id: CatalogId,
    pub name: String,
    pub resource_directory_id: DirectoryId,
    pub skillset_directory_id: DirectoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub variant_id: VariantId,
    pub name: String,
    pub description: String,
}

/// Implicit default namespace name, re-exported for convenience.
pub use tansive_core::scope::ROOT_NAMESPACE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Resource,
    Skillset,
}

/// A content-addressed reference stored in a schema directory at a given path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub hash: String,
    pub content_type: ObjectKind,
    pub references: Option<Vec<String>>,
    pub metadata: serde_json::Value,
    pub updated_at: Timestamp,
}

/// An immutable catalog object, keyed by `(tenant, hash_id)` where `hash_id` is the first 16 hex
/// characters of `hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObject {
    pub hash_id: String,
    pub hash: String,
    pub object_type: ObjectKind,
    pub version: i32,
    pub tenant_id: TenantId,
    pub compressed_payload: Vec<u8>,
}

impl CatalogObject {
    /// Derive the `hash_id` (first 16 hex chars) for a full hash string.
    pub fn hash_id_for(hash: &str) -> String {
        hash.chars().take(16).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: ViewId,
    pub catalog_id: CatalogId,
    pub label: String,
    pub def: ViewDef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatusSummary {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub catalog_id: CatalogId,
    pub variant_id: Option<VariantId>,
    pub skillset_path: String,
    pub skill_name: String,
    pub view_id: ViewId,
    pub tangent_id: Option<TangentId>,
    pub user_id: String,
    pub status_summary: SessionStatusSummary,
    pub status: serde_json::Value,
    pub info: serde_json::Value,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tangent {
    pub id: TangentId,
    pub tenant_id: TenantId,
    pub public_key_access: [u8; 32],
    pub public_key_log_signing: [u8; 32],
    pub url: String,
    pub capabilities: Vec<String>,
    pub created_by: String,
    pub onboarding_key: String,
}

/// Re-exported so callers of this crate's `SigningKeyStore` impl don't need a direct dependency
/// on `tansive-tokens` just for this type.
pub use tansive_tokens::SigningKeyRecord;
