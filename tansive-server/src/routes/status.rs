//! `GET /status` — server identity and the caller's currently adopted view.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::AuthExtractor;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub server_time: String,
    pub server_version: String,
    pub api_version: String,
    pub view_def: Option<tansive_policy::ViewDef>,
}

pub async fn status(State(state): State<AppState>, AuthExtractor(ctx): AuthExtractor) -> ApiResult<Json<StatusResponse>> {
    Ok(Json(StatusResponse {
        user_id: ctx.tenant_id.to_string(),
        server_time: chrono::Utc::now().to_rfc3339(),
        server_version: state.server_version.to_string(),
        api_version: tansive_tokens::token::TOKEN_VERSION.to_string(),
        view_def: Some(ctx.view),
    }))
}
