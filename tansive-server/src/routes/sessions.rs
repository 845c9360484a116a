//! `/sessions*` — session creation, PKCE handoff redemption, and TG-originated finalization.

use axum::extract::State;
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tansive_catalog::SessionStatusSummary;
use tansive_core::{ActionToken, ResourcePath, SessionId, TangentId, VariantId, ViewId};

use crate::auth::AuthExtractor;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tangent_auth::TangentAuth;

#[derive(Deserialize)]
pub struct CreateSessionRequestBody {
    pub variant_id: Option<VariantId>,
    pub skillset_path: String,
    pub skill_name: String,
    pub tangent_id: TangentId,
    pub user_id: String,
    pub code_challenge: String,
    pub session_ttl_secs: Option<i64>,
    pub auth_code_ttl_secs: Option<i64>,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub auth_code: String,
    pub tangent_url: String,
}

/// `POST /sessions` — the caller must hold a view authorizing `system.skillset.run` on the
/// target skillset path; the session is scoped to that view's catalog.
pub async fn create(
    State(state): State<AppState>,
    AuthExtractor(ctx): AuthExtractor,
    Json(req): Json<CreateSessionRequestBody>,
) -> ApiResult<(axum::http::StatusCode, Json<CreateSessionResponse>)> {
    let resource = ResourcePath::parse(&format!("res://skillsets/{}", req.skillset_path))
        .map_err(|e| ApiError::invalid_request(format!("invalid skillset path: {e}")))?;
    let action: ActionToken = "system.skillset.run".into();
    if !state.policy.is_allowed(&ctx.view, &resource, &action) {
        return Err(ApiError::new(crate::error::ErrorCode::DisallowedByPolicy, "running this skillset is denied by policy"));
    }

    let view_id: ViewId = ctx.view_id;
    let session_ttl = req.session_ttl_secs.map(Duration::seconds).unwrap_or(Duration::from_std(state.config.session_ttl).unwrap());
    let auth_code_ttl = req.auth_code_ttl_secs.map(Duration::seconds).unwrap_or(Duration::from_std(state.config.auth_code_ttl).unwrap());

    let handoff = state
        .sessions
        .create_session(
            tansive_session::CreateSessionRequest {
                tenant_id: ctx.tenant_id,
                catalog_id: ctx.view.scope.catalog,
                variant_id: req.variant_id,
                skillset_path: req.skillset_path,
                skill_name: req.skill_name,
                view_id,
                tangent_id: req.tangent_id,
                user_id: req.user_id,
                code_challenge: req.code_challenge,
                session_ttl,
                auth_code_ttl,
            },
            chrono::Utc::now(),
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: handoff.session_id,
            auth_code: handoff.auth_code,
            tangent_url: handoff.tangent_url,
        }),
    ))
}

#[derive(Deserialize)]
pub struct ExchangeRequest {
    pub auth_code: String,
    pub code_verifier: String,
}

#[derive(Serialize)]
pub struct ExchangeResponse {
    pub token: String,
    pub expires_at: tansive_core::Timestamp,
    pub session_id: SessionId,
    /// Carried alongside the bearer so the tangent can resolve and run the skill without a
    /// second round trip; mirrors the fields already on the persisted `Session` row.
    pub skillset_path: String,
    pub skill_name: String,
}

/// `POST /sessions/exchange` — the tangent's side of the PKCE handoff.
pub async fn exchange(State(state): State<AppState>, Json(req): Json<ExchangeRequest>) -> ApiResult<Json<ExchangeResponse>> {
    let redeemed = state.sessions.redeem_handoff(&req.auth_code, &req.code_verifier, chrono::Utc::now()).await?;
    Ok(Json(ExchangeResponse {
        token: redeemed.token.token,
        expires_at: redeemed.token.expires_at,
        session_id: redeemed.session.id,
        skillset_path: redeemed.session.skillset_path,
        skill_name: redeemed.session.skill_name,
    }))
}

#[derive(Deserialize)]
pub struct ExecutionStateRequest {
    pub session_id: SessionId,
    pub status_summary: SessionStatusSummary,
    pub status: serde_json::Value,
}

/// `POST /sessions/execution-state` (TG → CS): finalize a session's terminal status. Signed by
/// the tangent rather than bearing a view token; `TangentAuth` consumes the body to fold it into
/// the verified canonical string, so the request is parsed from its captured bytes here instead
/// of through a second `Json` extractor.
pub async fn execution_state(State(state): State<AppState>, tangent: TangentAuth) -> ApiResult<axum::http::StatusCode> {
    let req: ExecutionStateRequest =
        serde_json::from_slice(&tangent.body).map_err(|e| ApiError::invalid_request(format!("invalid JSON body: {e}")))?;
    state.sessions.finalize_session(req.session_id, req.status_summary, req.status, chrono::Utc::now()).await?;
    Ok(axum::http::StatusCode::OK)
}
