//! Catalog-server session manager: view adoption, session create/update/finalize.
//!
//! This is the CS-side half of the session lifecycle, up through handing the tangent a session
//! handle; the TG-side half (skill resolution, policy enforcement per invocation, runner
//! dispatch) lives in `tansive-runtime`.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use tansive_catalog::{CatalogRepository, Session, SessionRepository, SessionStatusSummary, TangentRepository, View, ViewRepository, DEFAULT_ADMIN_VIEW_LABEL};
use tansive_core::{ActionToken, CatalogId, ClaimMap, EntityIdType, ResourcePath, Scope, SessionError, SessionId, TangentId, TenantId, Timestamp, VariantId, ViewId};
use tansive_policy::PolicyEngine;
use tansive_tokens::{MintedToken, TokenService};

use crate::pkce::{AuthCodeEntry, AuthCodeTable};

/// Action required to adopt a non-default view; checked against the caller's *current* view.
pub const ADOPT_VIEW_ACTION: &str = "system.catalog.adoptView";

/// Scope carried inside an adoption token's additional claims.
fn scope_claims(scope: &Scope, view: &View) -> ClaimMap {
    let mut claims = ClaimMap::new();
    claims.insert(
        "scope",
        json!({
            "catalog": scope.catalog_name,
            "variant": scope.variant_name,
            "namespace": scope.namespace,
        }),
    );
    claims.insert("view", json!({"id": view.id.to_string(), "label": view.label}));
    claims
}

/// Parameters for starting a new session against a skillset+skill under an adopted view.
pub struct CreateSessionRequest {
    pub tenant_id: TenantId,
    pub catalog_id: CatalogId,
    pub variant_id: Option<VariantId>,
    pub skillset_path: String,
    pub skill_name: String,
    pub view_id: ViewId,
    pub tangent_id: TangentId,
    pub user_id: String,
    pub code_challenge: String,
    pub session_ttl: Duration,
    pub auth_code_ttl: Duration,
}

/// What `create_session` hands back to the client: the persisted session plus the one-time auth
/// code and the tangent URL the client should hand off to.
pub struct SessionHandoff {
    pub session_id: SessionId,
    pub auth_code: String,
    pub tangent_url: String,
}

/// What a successful PKCE redemption yields to the tangent.
pub struct RedeemedSession {
    pub session: Session,
    pub token: MintedToken,
}

/// Orchestrates view adoption and session lifecycle against the catalog repositories.
pub struct SessionManager {
    catalogs: Arc<dyn CatalogRepository>,
    views: Arc<dyn ViewRepository>,
    sessions: Arc<dyn SessionRepository>,
    tangents: Arc<dyn TangentRepository>,
    tokens: Arc<TokenService>,
    auth_codes: AuthCodeTable,
    policy: PolicyEngine,
}

impl SessionManager {
    pub fn new(
        catalogs: Arc<dyn CatalogRepository>,
        views: Arc<dyn ViewRepository>,
        sessions: Arc<dyn SessionRepository>,
        tangents: Arc<dyn TangentRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            catalogs,
            views,
            sessions,
            tangents,
            tokens,
            auth_codes: AuthCodeTable::new(),
            policy: PolicyEngine::new(),
        }
    }

    /// `POST /auth/default-view-adoptions/{catalog}`: adopt the implicit `_default-admin-view`.
    pub async fn adopt_default_view(&self, tenant: TenantId, catalog_name: &str) -> Result<MintedToken, SessionError> {
        let catalog = self
            .catalogs
            .get_catalog(tenant, catalog_name)
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: catalog_name.to_string(), label: DEFAULT_ADMIN_VIEW_LABEL.to_string() })?;

        let view = self
            .views
            .get_view(catalog.id, DEFAULT_ADMIN_VIEW_LABEL)
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: catalog_name.to_string(), label: DEFAULT_ADMIN_VIEW_LABEL.to_string() })?;

        let scope = Scope::catalog_only(catalog.id, catalog.name.clone());
        self.tokens
            .mint(tenant, scope_claims(&scope, &view))
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: catalog_name.to_string(), label: DEFAULT_ADMIN_VIEW_LABEL.to_string() })
    }

    /// `POST /auth/view-adoptions/{catalogRef}/{viewLabel}`: adopt a labeled view, gated on the
    /// caller's *current* view authorizing `system.catalog.adoptView` on the target catalog.
    pub async fn adopt_labeled_view(
        &self,
        tenant: TenantId,
        catalog_name: &str,
        view_label: &str,
        caller_view: &tansive_policy::ViewDef,
    ) -> Result<MintedToken, SessionError> {
        let catalog = self
            .catalogs
            .get_catalog(tenant, catalog_name)
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: catalog_name.to_string(), label: view_label.to_string() })?;

        let resource = ResourcePath::parse(&format!("res://catalogs/{catalog_name}"))
            .map_err(|_| SessionError::AdoptionDenied { label: view_label.to_string() })?;
        let action: ActionToken = ADOPT_VIEW_ACTION.into();
        if !self.policy.is_allowed(caller_view, &resource, &action) {
            return Err(SessionError::AdoptionDenied { label: view_label.to_string() });
        }

        let view = self
            .views
            .get_view(catalog.id, view_label)
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: catalog_name.to_string(), label: view_label.to_string() })?;

        let scope = Scope::catalog_only(catalog.id, catalog.name.clone());
        self.tokens
            .mint(tenant, scope_claims(&scope, &view))
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: catalog_name.to_string(), label: view_label.to_string() })
    }

    /// `POST /sessions`: persist a new running session and issue its one-time PKCE auth code.
    pub async fn create_session(&self, req: CreateSessionRequest, now: Timestamp) -> Result<SessionHandoff, SessionError> {
        let tangent = self
            .tangents
            .get_tangent(req.tangent_id)
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: req.catalog_id.to_string(), label: "tangent".to_string() })?;

        let session = Session {
            id: SessionId::now_v7(),
            tenant_id: req.tenant_id,
            catalog_id: req.catalog_id,
            variant_id: req.variant_id,
            skillset_path: req.skillset_path,
            skill_name: req.skill_name,
            view_id: req.view_id,
            tangent_id: Some(tangent.id),
            user_id: req.user_id,
            status_summary: SessionStatusSummary::Running,
            status: json!({}),
            info: json!({}),
            started_at: now,
            ended_at: None,
            expires_at: now + req.session_ttl,
        };

        self.sessions
            .create_session(session.clone())
            .await
            .map_err(|_| SessionError::ViewNotFound { catalog: session.catalog_id.to_string(), label: "session".to_string() })?;

        let entry = AuthCodeEntry {
            session_id: session.id.as_uuid(),
            tenant_id: session.tenant_id,
            catalog_id: session.catalog_id,
            view_id: session.view_id,
            code_challenge: req.code_challenge,
            expires_at: now + req.auth_code_ttl,
        };
        let auth_code = self.auth_codes.issue(entry);

        Ok(SessionHandoff { session_id: session.id, auth_code, tangent_url: tangent.url })
    }

    /// `POST /sessions/exchange`: redeem the auth code and return a short-lived bearer scoped
    /// to the session's view.
    pub async fn redeem_handoff(&self, code: &str, code_verifier: &str, now: Timestamp) -> Result<RedeemedSession, SessionError> {
        let entry = self.auth_codes.redeem(code, code_verifier, now)?;
        let session_id: SessionId = entry.session_id.to_string().parse().map_err(|_| SessionError::InvalidAuthCode)?;

        let session = self
            .sessions
            .get_session(session_id)
            .await
            .map_err(|_| SessionError::InvalidAuthCode)?;

        let view = self
            .views
            .get_view_by_id(session.view_id)
            .await
            .map_err(|_| SessionError::InvalidAuthCode)?;

        let scope = Scope::catalog_only(session.catalog_id, String::new());
        let token = self
            .tokens
            .mint(session.tenant_id, scope_claims(&scope, &view))
            .await
            .map_err(|_| SessionError::InvalidAuthCode)?;

        Ok(RedeemedSession { session, token })
    }

    /// `POST /sessions/execution-state` (TG → CS): finalize a session's terminal status.
    pub async fn finalize_session(
        &self,
        session_id: SessionId,
        status_summary: SessionStatusSummary,
        status: serde_json::Value,
        now: Timestamp,
    ) -> Result<(), tansive_core::CatalogError> {
        self.sessions.update_session_end(session_id, status_summary, status, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tansive_catalog::{Catalog, InMemoryCatalog, Tangent};
    use tansive_policy::{Intent, Rule, ViewDef};
    use tansive_tokens::{FixedClock, SigningKeyCache, TokenService};

    async fn setup() -> (SessionManager, Arc<InMemoryCatalog>, TenantId, CatalogId) {
        let store = Arc::new(InMemoryCatalog::new());
        let tenant_id = TenantId::now_v7();
        let catalog_id = CatalogId::now_v7();
        store
            .create_catalog(Catalog {
                id: catalog_id,
                tenant_id,
                project_id: tansive_core::ProjectId::now_v7(),
                name: "valid-catalog".to_string(),
                description: String::new(),
                info: json!({}),
            })
            .await
            .unwrap();

        let admin_view = View {
            id: ViewId::now_v7(),
            catalog_id,
            label: DEFAULT_ADMIN_VIEW_LABEL.to_string(),
            def: ViewDef::new(
                DEFAULT_ADMIN_VIEW_LABEL,
                Scope::catalog_only(catalog_id, "valid-catalog"),
                vec![Rule::new(Intent::Allow, vec!["system.catalog.admin".into()], vec![ResourcePath::parse("res://catalogs/valid-catalog").unwrap()])],
            ),
        };
        store.create_view(admin_view).await.unwrap();

        let cache = Arc::new(SigningKeyCache::new(store.clone(), "test-password"));
        let clock = Arc::new(FixedClock(1_700_000_000));
        let tokens = Arc::new(TokenService::new(cache, clock, "localhost:8080", 3600));

        let manager = SessionManager::new(store.clone(), store.clone(), store.clone(), store.clone(), tokens);
        (manager, store, tenant_id, catalog_id)
    }

    #[tokio::test]
    async fn scenario_a_default_adoption_yields_scope_and_allow_rule() {
        let (manager, _store, tenant_id, _catalog_id) = setup().await;
        let minted = manager.adopt_default_view(tenant_id, "valid-catalog").await.unwrap();
        assert!(!minted.token.is_empty());
    }

    #[tokio::test]
    async fn unknown_catalog_fails_default_adoption() {
        let (manager, _store, tenant_id, _catalog_id) = setup().await;
        assert!(manager.adopt_default_view(tenant_id, "nope").await.is_err());
    }

    #[tokio::test]
    async fn labeled_adoption_requires_adopt_view_permission() {
        let (manager, store, tenant_id, catalog_id) = setup().await;
        store
            .create_view(View {
                id: ViewId::now_v7(),
                catalog_id,
                label: "readonly".to_string(),
                def: ViewDef::new("readonly", Scope::catalog_only(catalog_id, "valid-catalog"), vec![]),
            })
            .await
            .unwrap();

        let powerless = ViewDef::new("powerless", Scope::catalog_only(catalog_id, "valid-catalog"), vec![]);
        let err = manager.adopt_labeled_view(tenant_id, "valid-catalog", "readonly", &powerless).await.unwrap_err();
        assert!(matches!(err, SessionError::AdoptionDenied { .. }));

        let admin = ViewDef::new(
            "admin",
            Scope::catalog_only(catalog_id, "valid-catalog"),
            vec![Rule::new(Intent::Allow, vec!["system.catalog.admin".into()], vec![ResourcePath::parse("res://catalogs/valid-catalog").unwrap()])],
        );
        assert!(manager.adopt_labeled_view(tenant_id, "valid-catalog", "readonly", &admin).await.is_ok());
    }

    async fn register_tangent(store: &InMemoryCatalog, tenant_id: TenantId) -> TangentId {
        let tangent_id = TangentId::now_v7();
        store
            .register_tangent(Tangent {
                id: tangent_id,
                tenant_id,
                public_key_access: [0u8; 32],
                public_key_log_signing: [0u8; 32],
                url: "https://tangent.local".to_string(),
                capabilities: vec![],
                created_by: "test".to_string(),
                onboarding_key: String::new(),
            })
            .await
            .unwrap();
        tangent_id
    }

    #[tokio::test]
    async fn scenario_d_pkce_redeem_once_then_fails() {
        let (manager, store, tenant_id, catalog_id) = setup().await;
        let view = store.get_view(catalog_id, DEFAULT_ADMIN_VIEW_LABEL).await.unwrap();
        let tangent_id = register_tangent(&store, tenant_id).await;

        let verifier = "a".repeat(64);
        let challenge = {
            use base64::engine::general_purpose::URL_SAFE_NO_PAD as B;
            use base64::Engine as _;
            use sha2::{Digest, Sha256};
            B.encode(Sha256::digest(verifier.as_bytes()))
        };

        let handoff = manager
            .create_session(
                CreateSessionRequest {
                    tenant_id,
                    catalog_id,
                    variant_id: None,
                    skillset_path: "demo/agent".to_string(),
                    skill_name: "run".to_string(),
                    view_id: view.id,
                    tangent_id,
                    user_id: "u1".to_string(),
                    code_challenge: challenge,
                    session_ttl: Duration::hours(1),
                    auth_code_ttl: Duration::minutes(10),
                },
                chrono::Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(handoff.tangent_url, "https://tangent.local");

        let now = chrono::Utc::now();
        let redeemed = manager.redeem_handoff(&handoff.auth_code, &verifier, now).await.unwrap();
        assert_eq!(redeemed.session.id, handoff.session_id);

        let err = manager.redeem_handoff(&handoff.auth_code, &verifier, now).await.unwrap_err();
        assert_eq!(err, SessionError::InvalidAuthCode);
    }

    #[tokio::test]
    async fn finalize_session_is_one_shot() {
        let (manager, store, tenant_id, catalog_id) = setup().await;
        let view = store.get_view(catalog_id, DEFAULT_ADMIN_VIEW_LABEL).await.unwrap();
        let tangent_id = register_tangent(&store, tenant_id).await;

        let session = Session {
            id: SessionId::now_v7(),
            tenant_id,
            catalog_id,
            variant_id: None,
            skillset_path: "demo/agent".to_string(),
            skill_name: "run".to_string(),
            view_id: view.id,
            tangent_id: Some(tangent_id),
            user_id: "u1".to_string(),
            status_summary: SessionStatusSummary::Running,
            status: json!({}),
            info: json!({}),
            started_at: chrono::Utc::now(),
            ended_at: None,
            expires_at: chrono::Utc::now() + Duration::hours(1),
        };
        store.create_session(session.clone()).await.unwrap();

        manager
            .finalize_session(session.id, SessionStatusSummary::Completed, json!({"ok": true}), chrono::Utc::now())
            .await
            .unwrap();

        let err = manager
            .finalize_session(session.id, SessionStatusSummary::Failed, json!({}), chrono::Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, tansive_core::CatalogError::SessionAlreadyFinalized { .. }));
    }
}
