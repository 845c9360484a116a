//! In-memory reference implementation of every repository trait, backed by `tokio::sync::RwLock`
//! maps. Not persistent; exists for tests and for the reference server deployment mode.

use std::collections::HashMap;

use async_trait::async_trait;
use tansive_core::{
    CatalogError, CatalogId, EntityIdType, ProjectId, SessionId, SigningKeyId, TangentId, TenantId, Timestamp,
    TokenError, VariantId, ViewId,
};
use tokio::sync::RwLock;

use crate::models::{
    Catalog, CatalogObject, DirectoryId, Namespace, ObjectRef, Session, SessionStatusSummary, SigningKeyRecord,
    Tangent, Tenant, Variant, View,
};
use crate::traits::{
    CatalogObjectRepository, CatalogRepository, NamespaceRepository, SchemaDirectoryRepository, SessionRepository,
    TangentRepository, TenantRepository, VariantRepository, ViewRepository,
};
use tansive_tokens::SigningKeyStore;

fn not_found(entity: &str, id: impl std::fmt::Display) -> CatalogError {
    CatalogError::NotFound { entity: entity.to_string(), id: id.to_string() }
}

fn already_exists(entity: &str, name: impl std::fmt::Display) -> CatalogError {
    CatalogError::AlreadyExists { entity: entity.to_string(), name: name.to_string() }
}

#[derive(Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    catalogs: HashMap<CatalogId, Catalog>,
    variants: HashMap<VariantId, Variant>,
    namespaces: HashMap<(VariantId, String), Namespace>,
    views: HashMap<ViewId, View>,
    directories: HashMap<DirectoryId, HashMap<String, ObjectRef>>,
    objects: HashMap<(TenantId, String), CatalogObject>,
    sessions: HashMap<SessionId, Session>,
    tangents: HashMap<TangentId, Tangent>,
    signing_keys: HashMap<(TenantId, SigningKeyId), SigningKeyRecord>,
}

/// Single in-process store backing every repository trait plus the token signing-key store.
/// Cheap to clone (an `Arc` around the lock would be the caller's job); constructed once and
/// shared behind an `Arc` by callers that need it from multiple tasks.
pub struct InMemoryCatalog {
    tables: RwLock<Tables>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self { tables: RwLock::new(Tables::default()) }
    }
}

#[async_trait]
impl TenantRepository for InMemoryCatalog {
    async fn create_tenant(&self, tenant: Tenant) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.tenants.contains_key(&tenant.id) {
            return Err(already_exists("tenant", tenant.id));
        }
        tables.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Tenant, CatalogError> {
        let tables = self.tables.read().await;
        tables.tenants.get(&id).cloned().ok_or_else(|| not_found("tenant", id))
    }

    async fn delete_tenant(&self, id: TenantId) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.tenants.remove(&id).is_none() {
            return Err(not_found("tenant", id));
        }

        let dead_catalogs: Vec<CatalogId> =
            tables.catalogs.values().filter(|c| c.tenant_id == id).map(|c| c.id).collect();
        for catalog_id in &dead_catalogs {
            let dead_variants: Vec<VariantId> =
                tables.variants.values().filter(|v| v.catalog_id == *catalog_id).map(|v| v.id).collect();
            for variant_id in &dead_variants {
                tables.namespaces.retain(|(vid, _), _| vid != variant_id);
                if let Some(variant) = tables.variants.remove(variant_id) {
                    tables.directories.remove(&variant.resource_directory_id);
                    tables.directories.remove(&variant.skillset_directory_id);
                }
            }
            tables.views.retain(|_, v| v.catalog_id != *catalog_id);
            tables.catalogs.remove(catalog_id);
        }
        tables.sessions.retain(|_, s| s.tenant_id != id);
        tables.objects.retain(|(tid, _), _| *tid != id);
        tables.tangents.retain(|_, t| t.tenant_id != id);
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn create_catalog(&self, catalog: Catalog) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.catalogs.values().any(|c| c.tenant_id == catalog.tenant_id && c.name == catalog.name) {
            return Err(already_exists("catalog", &catalog.name));
        }
        tables.catalogs.insert(catalog.id, catalog);
        Ok(())
    }

    async fn get_catalog(&self, tenant: TenantId, name: &str) -> Result<Catalog, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .catalogs
            .values()
            .find(|c| c.tenant_id == tenant && c.name == name)
            .cloned()
            .ok_or_else(|| not_found("catalog", name))
    }

    async fn get_catalog_by_id(&self, id: CatalogId) -> Result<Catalog, CatalogError> {
        let tables = self.tables.read().await;
        tables.catalogs.get(&id).cloned().ok_or_else(|| not_found("catalog", id))
    }

    async fn update_catalog(&self, catalog: Catalog) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.catalogs.contains_key(&catalog.id) {
            return Err(not_found("catalog", catalog.id));
        }
        tables.catalogs.insert(catalog.id, catalog);
        Ok(())
    }

    async fn delete_catalog(&self, tenant: TenantId, name: &str) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .catalogs
            .values()
            .find(|c| c.tenant_id == tenant && c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| not_found("catalog", name))?;
        tables.catalogs.remove(&id);
        tables.views.retain(|_, v| v.catalog_id != id);
        Ok(())
    }

    async fn list_catalogs(&self, tenant: TenantId, project: ProjectId) -> Result<Vec<Catalog>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .catalogs
            .values()
            .filter(|c| c.tenant_id == tenant && c.project_id == project)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VariantRepository for InMemoryCatalog {
    async fn create_variant(&self, variant: Variant) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.variants.values().any(|v| v.catalog_id == variant.catalog_id && v.name == variant.name) {
            return Err(already_exists("variant", &variant.name));
        }
        tables.directories.entry(variant.resource_directory_id).or_default();
        tables.directories.entry(variant.skillset_directory_id).or_default();
        tables.variants.insert(variant.id, variant);
        Ok(())
    }

    async fn get_variant(&self, catalog: CatalogId, name: &str) -> Result<Variant, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .variants
            .values()
            .find(|v| v.catalog_id == catalog && v.name == name)
            .cloned()
            .ok_or_else(|| not_found("variant", name))
    }

    async fn get_variant_by_id(&self, id: VariantId) -> Result<Variant, CatalogError> {
        let tables = self.tables.read().await;
        tables.variants.get(&id).cloned().ok_or_else(|| not_found("variant", id))
    }

    async fn delete_variant(&self, catalog: CatalogId, name: &str) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        let variant = tables
            .variants
            .values()
            .find(|v| v.catalog_id == catalog && v.name == name)
            .cloned()
            .ok_or_else(|| not_found("variant", name))?;
        tables.variants.remove(&variant.id);
        tables.namespaces.retain(|(vid, _), _| *vid != variant.id);
        tables.directories.remove(&variant.resource_directory_id);
        tables.directories.remove(&variant.skillset_directory_id);
        Ok(())
    }

    async fn list_variants(&self, catalog: CatalogId) -> Result<Vec<Variant>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.variants.values().filter(|v| v.catalog_id == catalog).cloned().collect())
    }
}

#[async_trait]
impl NamespaceRepository for InMemoryCatalog {
    async fn create_namespace(&self, ns: Namespace) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        let key = (ns.variant_id, ns.name.clone());
        if tables.namespaces.contains_key(&key) {
            return Err(already_exists("namespace", &ns.name));
        }
        tables.namespaces.insert(key, ns);
        Ok(())
    }

    async fn get_namespace(&self, variant: VariantId, name: &str) -> Result<Namespace, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .namespaces
            .get(&(variant, name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("namespace", name))
    }

    async fn delete_namespace(&self, variant: VariantId, name: &str) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.namespaces.remove(&(variant, name.to_string())).is_none() {
            return Err(not_found("namespace", name));
        }
        Ok(())
    }

    async fn list_namespaces(&self, variant: VariantId) -> Result<Vec<Namespace>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.namespaces.values().filter(|n| n.variant_id == variant).cloned().collect())
    }
}

#[async_trait]
impl ViewRepository for InMemoryCatalog {
    async fn create_view(&self, view: View) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.views.values().any(|v| v.catalog_id == view.catalog_id && v.label == view.label) {
            return Err(already_exists("view", &view.label));
        }
        tables.views.insert(view.id, view);
        Ok(())
    }

    async fn get_view(&self, catalog: CatalogId, label: &str) -> Result<View, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .views
            .values()
            .find(|v| v.catalog_id == catalog && v.label == label)
            .cloned()
            .ok_or_else(|| not_found("view", label))
    }

    async fn get_view_by_id(&self, id: ViewId) -> Result<View, CatalogError> {
        let tables = self.tables.read().await;
        tables.views.get(&id).cloned().ok_or_else(|| not_found("view", id))
    }

    async fn update_view(&self, view: View) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.views.contains_key(&view.id) {
            return Err(not_found("view", view.id));
        }
        tables.views.insert(view.id, view);
        Ok(())
    }

    async fn delete_view(&self, catalog: CatalogId, label: &str) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .views
            .values()
            .find(|v| v.catalog_id == catalog && v.label == label)
            .map(|v| v.id)
            .ok_or_else(|| not_found("view", label))?;
        tables.views.remove(&id);
        Ok(())
    }

    async fn list_views(&self, catalog: CatalogId) -> Result<Vec<View>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.views.values().filter(|v| v.catalog_id == catalog).cloned().collect())
    }
}

#[async_trait]
impl SchemaDirectoryRepository for InMemoryCatalog {
    async fn put_ref(&self, directory: DirectoryId, path: &str, object_ref: ObjectRef) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables.directories.entry(directory).or_default().insert(path.to_string(), object_ref);
        Ok(())
    }

    async fn get_ref(&self, directory: DirectoryId, path: &str) -> Result<Option<ObjectRef>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.directories.get(&directory).and_then(|dir| dir.get(path).cloned()))
    }

    async fn delete_ref(&self, directory: DirectoryId, path: &str) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        match tables.directories.get_mut(&directory) {
            Some(dir) if dir.remove(path).is_some() => Ok(()),
            _ => Err(not_found("schema directory entry", path)),
        }
    }

    async fn exists(&self, directory: DirectoryId, path: &str) -> Result<bool, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.directories.get(&directory).map(|dir| dir.contains_key(path)).unwrap_or(false))
    }

    async fn list_by_prefix(&self, directory: DirectoryId, prefix: &str) -> Result<Vec<(String, ObjectRef)>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .directories
            .get(&directory)
            .map(|dir| {
                dir.iter()
                    .filter(|(path, _)| path.starts_with(prefix))
                    .map(|(path, obj_ref)| (path.clone(), obj_ref.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_namespace_refs(&self, directory: DirectoryId, namespace_prefix: &str) -> Result<u64, CatalogError> {
        let mut tables = self.tables.write().await;
        let Some(dir) = tables.directories.get_mut(&directory) else {
            return Ok(0);
        };
        let before = dir.len();
        dir.retain(|path, _| !path.starts_with(namespace_prefix));
        Ok((before - dir.len()) as u64)
    }
}

#[async_trait]
impl CatalogObjectRepository for InMemoryCatalog {
    async fn insert_object(&self, object: CatalogObject) -> Result<bool, CatalogError> {
        let mut tables = self.tables.write().await;
        let key = (object.tenant_id, object.hash_id.clone());
        if tables.objects.contains_key(&key) {
            return Ok(false);
        }
        tables.objects.insert(key, object);
        Ok(true)
    }

    async fn get_object(&self, tenant: TenantId, hash_id: &str) -> Result<CatalogObject, CatalogError> {
        let tables = self.tables.read().await;
        tables
            .objects
            .get(&(tenant, hash_id.to_string()))
            .cloned()
            .ok_or_else(|| not_found("catalog object", hash_id))
    }

    async fn delete_object_if_unreferenced(&self, tenant: TenantId, hash_id: &str, ref_count: usize) -> Result<(), CatalogError> {
        if ref_count > 0 {
            return Err(CatalogError::StillReferenced { hash: hash_id.to_string(), refs: ref_count });
        }
        let mut tables = self.tables.write().await;
        if tables.objects.remove(&(tenant, hash_id.to_string())).is_none() {
            return Err(not_found("catalog object", hash_id));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryCatalog {
    async fn create_session(&self, session: Session) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.id) {
            return Err(already_exists("session", session.id));
        }
        tables.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, CatalogError> {
        let tables = self.tables.read().await;
        tables.sessions.get(&id).cloned().ok_or_else(|| not_found("session", id))
    }

    async fn update_session(&self, session: Session) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&session.id) {
            return Err(not_found("session", session.id));
        }
        tables.sessions.insert(session.id, session);
        Ok(())
    }

    async fn update_session_end(
        &self,
        id: SessionId,
        status_summary: SessionStatusSummary,
        status: serde_json::Value,
        ended_at: Timestamp,
    ) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        let session = tables.sessions.get_mut(&id).ok_or_else(|| not_found("session", id))?;
        if session.ended_at.is_some() {
            return Err(CatalogError::SessionAlreadyFinalized { id: id.to_string() });
        }
        session.status_summary = status_summary;
        session.status = status;
        session.ended_at = Some(ended_at);
        Ok(())
    }
}

#[async_trait]
impl TangentRepository for InMemoryCatalog {
    async fn register_tangent(&self, tangent: Tangent) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.tangents.contains_key(&tangent.id) {
            return Err(already_exists("tangent", tangent.id));
        }
        tables.tangents.insert(tangent.id, tangent);
        Ok(())
    }

    async fn get_tangent(&self, id: TangentId) -> Result<Tangent, CatalogError> {
        let tables = self.tables.read().await;
        tables.tangents.get(&id).cloned().ok_or_else(|| not_found("tangent", id))
    }
}

#[async_trait]
impl SigningKeyStore for InMemoryCatalog {
    async fn active_key(&self, tenant: TenantId) -> Result<Option<SigningKeyRecord>, TokenError> {
        let tables = self.tables.read().await;
        Ok(tables
            .signing_keys
            .iter()
            .find(|((t, _), record)| *t == tenant && record.is_active)
            .map(|(_, record)| record.clone()))
    }

    async fn get_key(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<Option<SigningKeyRecord>, TokenError> {
        let tables = self.tables.read().await;
        Ok(tables.signing_keys.get(&(tenant, key_id)).cloned())
    }

    async fn insert_key(&self, tenant: TenantId, record: SigningKeyRecord) -> Result<(), TokenError> {
        let mut tables = self.tables.write().await;
        tables.signing_keys.insert((tenant, record.key_id), record);
        Ok(())
    }

    async fn activate_key(&self, tenant: TenantId, key_id: SigningKeyId) -> Result<(), TokenError> {
        let mut tables = self.tables.write().await;
        if !tables.signing_keys.contains_key(&(tenant, key_id)) {
            return Err(TokenError::UnknownKey { kid: key_id.to_string() });
        }
        for ((t, k), record) in tables.signing_keys.iter_mut() {
            if *t == tenant {
                record.is_active = *k == key_id;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tansive_core::scope::ROOT_NAMESPACE;
    use uuid::Uuid;

    fn tenant() -> Tenant {
        Tenant { id: TenantId::now_v7(), name: "acme".to_string() }
    }

    #[tokio::test]
    async fn create_and_get_tenant_roundtrips() {
        let store = InMemoryCatalog::new();
        let t = tenant();
        store.create_tenant(t.clone()).await.unwrap();
        assert_eq!(store.get_tenant(t.id).await.unwrap(), t);
    }

    #[tokio::test]
    async fn duplicate_tenant_id_rejected() {
        let store = InMemoryCatalog::new();
        let t = tenant();
        store.create_tenant(t.clone()).await.unwrap();
        assert!(store.create_tenant(t).await.is_err());
    }

    #[tokio::test]
    async fn deleting_tenant_cascades_to_catalogs_and_variants() {
        let store = InMemoryCatalog::new();
        let t = tenant();
        store.create_tenant(t.clone()).await.unwrap();

        let catalog = Catalog {
            id: CatalogId::now_v7(),
            tenant_id: t.id,
            project_id: ProjectId::now_v7(),
            name: "main".to_string(),
            description: String::new(),
            info: serde_json::json!({}),
        };
        store.create_catalog(catalog.clone()).await.unwrap();

        let variant = Variant {
            id: VariantId::now_v7(),
            catalog_id: catalog.id,
            name: "dev".to_string(),
            resource_directory_id: Uuid::new_v4(),
            skillset_directory_id: Uuid::new_v4(),
        };
        store.create_variant(variant.clone()).await.unwrap();
        store
            .create_namespace(Namespace {
                variant_id: variant.id,
                name: ROOT_NAMESPACE.to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        store.delete_tenant(t.id).await.unwrap();

        assert!(store.get_tenant(t.id).await.is_err());
        assert!(store.get_catalog_by_id(catalog.id).await.is_err());
        assert!(store.get_variant_by_id(variant.id).await.is_err());
        assert!(store.list_namespaces(variant.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn object_insertion_is_idempotent() {
        let store = InMemoryCatalog::new();
        let tenant_id = TenantId::now_v7();
        let obj = CatalogObject {
            hash_id: "abcdef0123456789".to_string(),
            hash: "abcdef0123456789fullhash".to_string(),
            object_type: crate::models::ObjectKind::Resource,
            version: 1,
            tenant_id,
            compressed_payload: vec![1, 2, 3],
        };
        assert!(store.insert_object(obj.clone()).await.unwrap());
        assert!(!store.insert_object(obj).await.unwrap());
    }

    #[tokio::test]
    async fn delete_object_fails_when_still_referenced() {
        let store = InMemoryCatalog::new();
        let tenant_id = TenantId::now_v7();
        let obj = CatalogObject {
            hash_id: "abcdef0123456789".to_string(),
            hash: "abcdef0123456789fullhash".to_string(),
            object_type: crate::models::ObjectKind::Resource,
            version: 1,
            tenant_id,
            compressed_payload: vec![],
        };
        store.insert_object(obj).await.unwrap();
        let err = store.delete_object_if_unreferenced(tenant_id, "abcdef0123456789", 2).await.unwrap_err();
        assert!(matches!(err, CatalogError::StillReferenced { .. }));
    }

    #[tokio::test]
    async fn session_end_is_one_shot() {
        let store = InMemoryCatalog::new();
        let session = Session {
            id: SessionId::now_v7(),
            tenant_id: TenantId::now_v7(),
            catalog_id: CatalogId::now_v7(),
            variant_id: None,
            skillset_path: "/skills".to_string(),
            skill_name: "doit".to_string(),
            view_id: ViewId::now_v7(),
            tangent_id: None,
            user_id: "u1".to_string(),
            status_summary: SessionStatusSummary::Running,
            status: serde_json::json!({}),
            info: serde_json::json!({}),
            started_at: chrono::Utc::now(),
            ended_at: None,
            expires_at: chrono::Utc::now(),
        };
        store.create_session(session.clone()).await.unwrap();
        store
            .update_session_end(session.id, SessionStatusSummary::Completed, serde_json::json!({"ok": true}), chrono::Utc::now())
            .await
            .unwrap();

        let err = store
            .update_session_end(session.id, SessionStatusSummary::Failed, serde_json::json!({}), chrono::Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SessionAlreadyFinalized { .. }));
    }

    #[tokio::test]
    async fn schema_directory_prefix_listing_and_namespace_delete() {
        let store = InMemoryCatalog::new();
        let dir = Uuid::new_v4();
        let make_ref = |hash: &str| ObjectRef {
            hash: hash.to_string(),
            content_type: crate::models::ObjectKind::Resource,
            references: None,
            metadata: serde_json::json!({}),
            updated_at: chrono::Utc::now(),
        };
        store.put_ref(dir, "/ns1/a", make_ref("h1")).await.unwrap();
        store.put_ref(dir, "/ns1/b", make_ref("h2")).await.unwrap();
        store.put_ref(dir, "/ns2/a", make_ref("h3")).await.unwrap();

        assert_eq!(store.list_by_prefix(dir, "/ns1/").await.unwrap().len(), 2);
        let deleted = store.delete_namespace_refs(dir, "/ns1/").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.list_by_prefix(dir, "/ns1/").await.unwrap().len(), 0);
        assert!(store.exists(dir, "/ns2/a").await.unwrap());
    }

    #[tokio::test]
    async fn signing_key_store_roundtrips_and_activates() {
        let store = InMemoryCatalog::new();
        let tenant_id = TenantId::now_v7();
        assert!(store.active_key(tenant_id).await.unwrap().is_none());

        let key_id = SigningKeyId::now_v7();
        let record = SigningKeyRecord {
            key_id,
            public_key: [1u8; 32],
            encrypted_private_key: vec![9, 9, 9],
            is_active: false,
        };
        store.insert_key(tenant_id, record.clone()).await.unwrap();
        assert!(store.active_key(tenant_id).await.unwrap().is_none());

        store.activate_key(tenant_id, key_id).await.unwrap();
        assert_eq!(store.active_key(tenant_id).await.unwrap().unwrap().key_id, key_id);

        let err = store.activate_key(tenant_id, SigningKeyId::now_v7()).await.unwrap_err();
        assert!(matches!(err, TokenError::UnknownKey { .. }));
    }
}
