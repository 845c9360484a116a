//! Shared test fixtures for the tansive workspace: a deterministic clock, Ed25519 test keypair
//! generation, and a pre-seeded `InMemoryCatalog` builder, so individual crates' test modules
//! don't each re-derive the same tenant/catalog/view scaffolding.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde_json::json;

use tansive_catalog::{Catalog, CatalogRepository, InMemoryCatalog, View, ViewRepository, DEFAULT_ADMIN_VIEW_LABEL};
use tansive_core::{CatalogId, EntityIdType, ProjectId, Scope, TenantId, ViewId};
use tansive_policy::{Intent, Rule, ViewDef};

pub use tansive_tokens::{FixedClock, TokenClock};

/// A fixed instant (2023-11-14T22:13:20Z) used across test suites so token expiry/hashlog
/// timestamps never depend on wall-clock time.
pub const FIXED_EPOCH_SECS: i64 = 1_700_000_000;

/// Build the default deterministic clock used by most crates' test modules.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(FIXED_EPOCH_SECS))
}

/// Generate a fresh random Ed25519 keypair, for tests that need key material but don't care
/// which key it is (signing tests, hashlog writer construction).
pub fn random_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// A catalog, its tenant/project ids, and a ready-to-use admin `View` seeded into an
/// `InMemoryCatalog`, for tests that just need "some valid catalog with an admin view" without
/// reproducing the boilerplate by hand.
pub struct CatalogFixture {
    pub store: Arc<InMemoryCatalog>,
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub catalog_id: CatalogId,
    pub catalog_name: String,
    pub admin_view_id: ViewId,
}

/// Seed a fresh `InMemoryCatalog` with one tenant, one project, one catalog named
/// `catalog_name`, and its implicit `_default-admin-view` granting `system.catalog.admin` over
/// that catalog.
pub async fn seeded_catalog(catalog_name: &str) -> CatalogFixture {
    let store = Arc::new(InMemoryCatalog::new());
    let tenant_id = TenantId::now_v7();
    let project_id = ProjectId::now_v7();
    let catalog_id = CatalogId::now_v7();

    store
        .create_catalog(Catalog {
            id: catalog_id,
            tenant_id,
            project_id,
            name: catalog_name.to_string(),
            description: String::new(),
            info: json!({}),
        })
        .await
        .expect("seeding a fresh catalog never conflicts");

    let admin_view_id = ViewId::now_v7();
    store
        .create_view(View {
            id: admin_view_id,
            catalog_id,
            label: DEFAULT_ADMIN_VIEW_LABEL.to_string(),
            def: ViewDef::new(
                DEFAULT_ADMIN_VIEW_LABEL,
                Scope::catalog_only(catalog_id, catalog_name),
                vec![Rule::new(
                    Intent::Allow,
                    vec!["system.catalog.admin".into()],
                    vec![tansive_core::ResourcePath::parse(&format!("res://catalogs/{catalog_name}")).unwrap()],
                )],
            ),
        })
        .await
        .expect("seeding the default admin view never conflicts");

    CatalogFixture { store, tenant_id, project_id, catalog_id, catalog_name: catalog_name.to_string(), admin_view_id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_catalog_has_a_working_admin_view() {
        let fixture = seeded_catalog("widgets").await;
        let view = fixture.store.get_view(fixture.catalog_id, DEFAULT_ADMIN_VIEW_LABEL).await.unwrap();
        assert_eq!(view.id, fixture.admin_view_id);
        assert!(view.def.rules.iter().any(|r| r.intent == Intent::Allow));
    }

    #[test]
    fn fixed_clock_reports_the_configured_instant() {
        let clock = fixed_clock();
        assert_eq!(clock.now_epoch_secs(), FIXED_EPOCH_SECS);
    }
}
