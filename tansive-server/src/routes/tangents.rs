//! `POST /tangents` — single-user mode tangent onboarding.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tansive_catalog::{Tangent, TangentRepository};
use tansive_core::{EntityIdType, TangentId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterTangentRequest {
    pub public_key_access: [u8; 32],
    pub public_key_log_signing: [u8; 32],
    pub url: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub created_by: String,
    pub onboarding_key: String,
}

#[derive(Serialize)]
pub struct RegisterTangentResponse {
    pub tangent_id: TangentId,
}

pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterTangentRequest>) -> ApiResult<Json<RegisterTangentResponse>> {
    if !state.config.single_user_mode {
        return Err(ApiError::unauthorized("tangent onboarding is only available in single-user mode"));
    }
    if req.onboarding_key != state.config.onboarding_key {
        return Err(ApiError::unauthorized("onboarding key does not match"));
    }

    let tangent = Tangent {
        id: TangentId::now_v7(),
        tenant_id: state.tenant_id,
        public_key_access: req.public_key_access,
        public_key_log_signing: req.public_key_log_signing,
        url: req.url,
        capabilities: req.capabilities,
        created_by: req.created_by,
        onboarding_key: req.onboarding_key,
    };
    let tangent_id = tangent.id;
    state.store.register_tangent(tangent).await?;
    Ok(Json(RegisterTangentResponse { tangent_id }))
}
