//! Repository contracts consumed by the catalog server and tangent session runtime.
//!
//! Split by entity rather than one monolithic trait, so a future persistence backend can
//! implement only the subset it needs to back (e.g. a read replica implementing just
//! `ViewRepository`).

use async_trait::async_trait;
use tansive_core::{CatalogError, CatalogId, ProjectId, SessionId, TangentId, TenantId, VariantId, ViewId};

use crate::models::{Catalog, CatalogObject, DirectoryId, Namespace, ObjectRef, Session, Tangent, Tenant, Variant, View};

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create_tenant(&self, tenant: Tenant) -> Result<(), CatalogError>;
    async fn get_tenant(&self, id: TenantId) -> Result<Tenant, CatalogError>;
    /// Cascades: deletes every catalog, variant, namespace, view, session, and object owned by
    /// this tenant.
    async fn delete_tenant(&self, id: TenantId) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_catalog(&self, catalog: Catalog) -> Result<(), CatalogError>;
    async fn get_catalog(&self, tenant: TenantId, name: &str) -> Result<Catalog, CatalogError>;
    async fn get_catalog_by_id(&self, id: CatalogId) -> Result<Catalog, CatalogError>;
    async fn update_catalog(&self, catalog: Catalog) -> Result<(), CatalogError>;
    async fn delete_catalog(&self, tenant: TenantId, name: &str) -> Result<(), CatalogError>;
    async fn list_catalogs(&self, tenant: TenantId, project: ProjectId) -> Result<Vec<Catalog>, CatalogError>;
}

#[async_trait]
pub trait VariantRepository: Send + Sync {
    /// Creates the variant together with its two schema directories atomically.
    async fn create_variant(&self, variant: Variant) -> Result<(), CatalogError>;
    async fn get_variant(&self, catalog: CatalogId, name: &str) -> Result<Variant, CatalogError>;
    async fn get_variant_by_id(&self, id: VariantId) -> Result<Variant, CatalogError>;
    async fn delete_variant(&self, catalog: CatalogId, name: &str) -> Result<(), CatalogError>;
    async fn list_variants(&self, catalog: CatalogId) -> Result<Vec<Variant>, CatalogError>;
}

#[async_trait]
pub trait NamespaceRepository: Send + Sync {
    async fn create_namespace(&self, ns: Namespace) -> Result<(), CatalogError>;
    async fn get_namespace(&self, variant: VariantId, name: &str) -> Result<Namespace, CatalogError>;
    async fn delete_namespace(&self, variant: VariantId, name: &str) -> Result<(), CatalogError>;
    async fn list_namespaces(&self, variant: VariantId) -> Result<Vec<Namespace>, CatalogError>;
}

#[async_trait]
pub trait ViewRepository: Send + Sync {
    async fn create_view(&self, view: View) -> Result<(), CatalogError>;
    async fn get_view(&self, catalog: CatalogId, label: &str) -> Result<View, CatalogError>;
    async fn get_view_by_id(&self, id: ViewId) -> Result<View, CatalogError>;
    async fn update_view(&self, view: View) -> Result<(), CatalogError>;
    async fn delete_view(&self, catalog: CatalogId, label: &str) -> Result<(), CatalogError>;
    async fn list_views(&self, catalog: CatalogId) -> Result<Vec<View>, CatalogError>;
}

/// Label of the implicit default-admin view created alongside every catalog.
pub const DEFAULT_ADMIN_VIEW_LABEL: &str = "_default-admin-view";

#[async_trait]
pub trait SchemaDirectoryRepository: Send + Sync {
    /// Add or replace the ref at `path` within `directory`. Atomic per (directory, path).
    async fn put_ref(&self, directory: DirectoryId, path: &str, object_ref: ObjectRef) -> Result<(), CatalogError>;

    async fn get_ref(&self, directory: DirectoryId, path: &str) -> Result<Option<ObjectRef>, CatalogError>;

    async fn delete_ref(&self, directory: DirectoryId, path: &str) -> Result<(), CatalogError>;

    async fn exists(&self, directory: DirectoryId, path: &str) -> Result<bool, CatalogError>;

    /// List all `(path, ObjectRef)` pairs whose path starts with `prefix`.
    async fn list_by_prefix(&self, directory: DirectoryId, prefix: &str) -> Result<Vec<(String, ObjectRef)>, CatalogError>;

    /// Delete every ref whose path falls under the given namespace segment (e.g. `/ns1/`).
    async fn delete_namespace_refs(&self, directory: DirectoryId, namespace_prefix: &str) -> Result<u64, CatalogError>;
}

#[async_trait]
pub trait CatalogObjectRepository: Send + Sync {
    /// Idempotent: inserting an identical payload twice is a no-op and returns `Ok(false)`
    /// (already existed); a genuinely new object returns `Ok(true)`.
    async fn insert_object(&self, object: CatalogObject) -> Result<bool, CatalogError>;

    async fn get_object(&self, tenant: TenantId, hash_id: &str) -> Result<CatalogObject, CatalogError>;

    /// Delete the object if (and only if) no schema directory in the tenant still references its
    /// hash. `ref_count` is supplied by the caller, which is expected to have checked every
    /// directory it manages; this method enforces the invariant rather than computing the count
    /// itself (it has no visibility into directory state by hash).
    async fn delete_object_if_unreferenced(&self, tenant: TenantId, hash_id: &str, ref_count: usize) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_session(&self, session: Session) -> Result<(), CatalogError>;
    async fn get_session(&self, id: SessionId) -> Result<Session, CatalogError>;
    async fn update_session(&self, session: Session) -> Result<(), CatalogError>;

    /// Set `ended_at`, `status_summary`, and `status` exactly once. Fails with `NotFound` if the
    /// session is already terminal (finalization is a one-shot transition).
    async fn update_session_end(
        &self,
        id: SessionId,
        status_summary: crate::models::SessionStatusSummary,
        status: serde_json::Value,
        ended_at: tansive_core::Timestamp,
    ) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait TangentRepository: Send + Sync {
    async fn register_tangent(&self, tangent: Tangent) -> Result<(), CatalogError>;
    async fn get_tangent(&self, id: TangentId) -> Result<Tangent, CatalogError>;
}
