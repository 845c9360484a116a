//! Bearer-token authentication extractor for the Catalog Server.
//!
//! A typed `FromRequestParts` extractor that requires the caller to have already adopted a view
//! (its `view` claim resolves to a real `ViewDef`), so route handlers that need policy context
//! never have to re-derive it from raw claims.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use tansive_catalog::ViewRepository;
use tansive_core::{TenantId, ViewId};
use tansive_policy::ViewDef;
use tansive_tokens::TokenService;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller's tenant and currently adopted view.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub tenant_id: TenantId,
    pub view_id: ViewId,
    pub view_label: String,
    pub view: ViewDef,
}

pub struct AuthExtractor(pub AuthContext);

impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Authorization header must use the Bearer scheme"))?;

        let claims = if app_state.config.single_user_mode
            && app_state.config.test_token.as_deref().is_some_and(|t| t == token)
        {
            // A distinct credential: stands in for a bare,
            // just-minted identity token. Never accepted outside single-user mode, and carries no
            // `view` claim of its own, so it still has to go through view adoption like any other
            // freshly issued token.
            tansive_tokens::ValidatedClaims {
                tenant_id: app_state.tenant_id,
                jti: "test-token".to_string(),
                issued_at: 0,
                expires_at: i64::MAX,
                claims: tansive_core::ClaimMap::new(),
            }
        } else {
            app_state.tokens.validate(app_state.tenant_id, token).await?
        };

        let view_claim = claims
            .claims
            .get("view")
            .ok_or_else(|| ApiError::unauthorized("token carries no adopted view; call an adoption endpoint first"))?;
        let view_id: ViewId = view_claim
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ApiError::unauthorized("token's view claim is malformed"))?;
        let view_label = view_claim.get("label").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let view = app_state
            .store
            .get_view_by_id(view_id)
            .await
            .map_err(|_| ApiError::unauthorized("adopted view no longer exists"))?;

        Ok(AuthExtractor(AuthContext {
            tenant_id: app_state.tenant_id,
            view_id,
            view_label,
            view: view.def,
        }))
    }
}

/// Mint a bare (unscoped) identity token for `POST /auth/login`, single-user mode only.
pub async fn login(tokens: &TokenService, tenant_id: TenantId) -> Result<tansive_tokens::MintedToken, ApiError> {
    Ok(tokens.mint(tenant_id, tansive_core::ClaimMap::new()).await?)
}
