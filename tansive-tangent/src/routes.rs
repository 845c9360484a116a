//! Tangent HTTP surface: session bootstrap and the MCP tool-bridge endpoint.
//!
//! `POST /session/start` turns a redeemed PKCE code into a running `SessionRuntime` before
//! `/session/mcp` has anything to dispatch to. It plays the same role here that
//! `tansive_session::redeem_handoff` plays on the Catalog Server side of the same handoff.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tansive_catalog::SessionStatusSummary;
use tansive_eventbus::EventBus;
use tansive_hashlog::HashlogWriter;
use tansive_runtime::{HttpSkillsetSource, NodeJsTransform, SessionRuntime};
use uuid::Uuid;

use crate::client::CatalogServerClient;
use crate::error::{TangentError, TangentResult};
use crate::sessions::{SessionRegistry, TangentSession};
use crate::state::TangentState;

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub auth_code: String,
    pub code_verifier: String,
    #[serde(default)]
    pub session_variables: Value,
}

#[derive(Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    /// `tn_<random>` bearer the client presents on subsequent `/session/mcp` calls.
    pub bearer: String,
}

/// `POST /session/start` — redeem the PKCE auth code, fetch the adopted view, and stand up the
/// session's runtime.
pub async fn start(State(state): State<TangentState>, Json(req): Json<StartSessionRequest>) -> TangentResult<Json<StartSessionResponse>> {
    let redeemed = state.cs_client.exchange(&req.auth_code, &req.code_verifier).await?;
    let view = state.cs_client.fetch_view(&redeemed.token).await?;

    let mut random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random);
    let bearer = format!("tn_{}", hex::encode(random));
    let mcp_key = mcp_key_from_bearer(&bearer)?;

    let mut signing_key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut signing_key);
    let log_path = std::env::temp_dir().join(format!("tansive-session-{}.jsonl", redeemed.session_id));
    let audit = Arc::new(
        HashlogWriter::create(log_path, &signing_key, 1)
            .map_err(|e| TangentError::new(crate::error::ErrorCode::InternalError, e.to_string()))?,
    );

    let skillsets = HttpSkillsetSource::new(
        reqwest::Client::new(),
        state.config.catalog_server_url.clone(),
        redeemed.token.clone(),
        view.scope.catalog_name.clone(),
        view.scope.variant_name.clone().unwrap_or_default(),
    );
    let socket_endpoint = format!("unix://{}", state.config.socket_path.display());
    let session_variables = req.session_variables.clone();

    let runtime = SessionRuntime::new(
        redeemed.session_id,
        redeemed.skillset_path,
        view,
        socket_endpoint,
        "session".to_string(),
        req.session_variables,
        state.config.max_call_depth,
        Arc::new(EventBus::new()),
        audit,
        skillsets,
        tansive_runners::RunnerRegistry::default(),
        Arc::new(NodeJsTransform::new()),
    );

    let session_id = redeemed.session_id;
    state.sessions.register(TangentSession { session_id, mcp_key, runtime });

    // The session's root call: the skill named at `POST /sessions` creation time, run to
    // completion in the background. Sub-tool calls it makes arrive over the local socket;
    // interactive callers reach it through `/session/mcp` while it runs. Finalization and the
    // execution-state report happen once it returns, .6's per-session model.
    let sessions = state.sessions.clone();
    let cs_client = state.cs_client.clone();
    let skill_name = redeemed.skill_name;
    tokio::spawn(async move {
        let Some(session) = sessions.get_by_session_id(session_id) else { return };
        let outcome = session.runtime.run(None, &skill_name, session_variables).await;
        if let Err(err) = &outcome {
            tracing::warn!(%session_id, %err, "session root invocation failed");
        }
        finalize_and_report(&sessions, &cs_client, session_id).await;
    });

    Ok(Json(StartSessionResponse { session_id, bearer }))
}

/// Shared by the background root-call completion path and the explicit `/session/end` endpoint;
/// idempotent because `HashlogWriter::close` is and `SessionRegistry::remove` only fires once.
async fn finalize_and_report(sessions: &SessionRegistry, cs_client: &CatalogServerClient, session_id: Uuid) {
    let Some(session) = sessions.remove(session_id) else { return };
    match session.runtime.finalize() {
        Ok((audit_log, verification_key)) => {
            let status = json!({"auditLog": audit_log, "verificationKey": hex::encode(verification_key)});
            if let Err(err) = cs_client.report_execution_state(session_id, SessionStatusSummary::Completed, &status).await {
                tracing::warn!(%session_id, %err, "failed to report execution-state to catalog server");
            }
        }
        Err(err) => {
            tracing::error!(%session_id, %err, "session finalization failed; reporting empty audit log");
            let status = json!({"error": err.to_string()});
            if let Err(report_err) = cs_client.report_execution_state(session_id, SessionStatusSummary::Failed, &status).await {
                tracing::warn!(%session_id, %report_err, "failed to report execution-state to catalog server");
            }
        }
    }
}

/// JSON-RPC 2.0 envelope the MCP bridge speaks. The method name is the skill name; params
/// become `inputArgs`.
#[derive(Deserialize)]
pub struct McpRequest {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Serialize)]
pub struct McpResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
}

fn mcp_key_from_bearer(bearer: &str) -> TangentResult<String> {
    let random_hex = bearer.strip_prefix("tn_").ok_or_else(|| TangentError::unauthorized("bearer must use the tn_ scheme"))?;
    Ok(hex::encode(Sha256::digest(random_hex.as_bytes())))
}

/// `POST /session/mcp` — Authorization: `Bearer tn_<random>`. The SHA-256 digest of the random
/// half is the session's lookup key.
pub async fn mcp(
    State(state): State<TangentState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<McpRequest>,
) -> TangentResult<Json<McpResponse>> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| TangentError::unauthorized("missing Authorization header"))?;
    let bearer = auth.strip_prefix("Bearer ").ok_or_else(|| TangentError::unauthorized("Authorization header must use the Bearer scheme"))?;
    let mcp_key = mcp_key_from_bearer(bearer)?;

    let session = state.sessions.get_by_mcp_key(&mcp_key).ok_or_else(|| TangentError::not_found("no running session for this bearer"))?;

    match session.runtime.run(None, &req.method, req.params).await {
        Ok((invocation_id, outcome)) => Ok(Json(McpResponse {
            jsonrpc: "2.0",
            id: req.id,
            result: Some(json!({"invocationID": invocation_id, "output": outcome.output, "exitCode": outcome.exit_code})),
            error: None,
        })),
        Err(err) => Ok(Json(McpResponse {
            jsonrpc: "2.0",
            id: req.id,
            result: None,
            error: Some(McpError { code: -32000, message: err.to_string() }),
        })),
    }
}

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub session_id: Uuid,
}

/// `POST /session/end` — finalize a session: flush/close the audit log, report terminal status
/// to CS, and forget the session locally regardless of whether the report succeeded.
pub async fn end(
    State(state): State<TangentState>,
    headers: axum::http::HeaderMap,
) -> TangentResult<Json<EndSessionResponse>> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| TangentError::unauthorized("missing Authorization header"))?;
    let bearer = auth.strip_prefix("Bearer ").ok_or_else(|| TangentError::unauthorized("Authorization header must use the Bearer scheme"))?;
    let mcp_key = mcp_key_from_bearer(bearer)?;

    let session_id = state.sessions.get_by_mcp_key(&mcp_key).ok_or_else(|| TangentError::not_found("no running session for this bearer"))?.session_id;
    let session = state.sessions.remove(session_id).ok_or_else(|| TangentError::not_found("session already finalized"))?;

    match session.runtime.finalize() {
        Ok((audit_log, verification_key)) => {
            let status = json!({
                "auditLog": audit_log,
                "verificationKey": hex::encode(verification_key),
            });
            if let Err(err) = state.cs_client.report_execution_state(session_id, SessionStatusSummary::Completed, &status).await {
                tracing::warn!(%session_id, %err, "failed to report execution-state to catalog server");
            }
        }
        Err(err) => {
            tracing::error!(%session_id, %err, "session finalization failed; reporting empty audit log");
            let status = json!({"error": err.to_string()});
            if let Err(report_err) = state.cs_client.report_execution_state(session_id, SessionStatusSummary::Failed, &status).await {
                tracing::warn!(%session_id, %report_err, "failed to report execution-state to catalog server");
            }
        }
    }

    Ok(Json(EndSessionResponse { session_id }))
}

/// Assemble the tangent's HTTP router.
pub fn build_router(state: TangentState) -> axum::Router {
    use axum::routing::post;
    axum::Router::new()
        .route("/session/start", post(start))
        .route("/session/mcp", post(mcp))
        .route("/session/end", post(end))
        .with_state(state)
}
