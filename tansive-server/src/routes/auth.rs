//! `/auth/*`: bare login and view adoption.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::auth::{self as auth_support, AuthExtractor};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: tansive_core::Timestamp,
}

impl From<tansive_tokens::MintedToken> for TokenResponse {
    fn from(minted: tansive_tokens::MintedToken) -> Self {
        Self { token: minted.token, expires_at: minted.expires_at }
    }
}

/// `POST /auth/login` — single-user mode only; mints an unscoped identity token.
pub async fn login(State(state): State<AppState>) -> ApiResult<Json<TokenResponse>> {
    if !state.config.single_user_mode {
        return Err(crate::error::ApiError::unauthorized("login is only available in single-user mode"));
    }
    let minted = auth_support::login(&state.tokens, state.tenant_id).await?;
    Ok(Json(minted.into()))
}

/// `POST /auth/default-view-adoptions/{catalog}`.
pub async fn adopt_default_view(State(state): State<AppState>, Path(catalog): Path<String>) -> ApiResult<Json<TokenResponse>> {
    let minted = state.sessions.adopt_default_view(state.tenant_id, &catalog).await?;
    Ok(Json(minted.into()))
}

/// `POST /auth/view-adoptions/{catalogRef}/{viewLabel}` — requires the caller to already hold a
/// view authorizing `system.catalog.adoptView` on the target catalog.
pub async fn adopt_labeled_view(
    State(state): State<AppState>,
    Path((catalog, label)): Path<(String, String)>,
    AuthExtractor(ctx): AuthExtractor,
) -> ApiResult<Json<TokenResponse>> {
    let minted = state.sessions.adopt_labeled_view(state.tenant_id, &catalog, &label, &ctx.view).await?;
    Ok(Json(minted.into()))
}
