//! HTTP client for the tangent's calls back to the Catalog Server: PKCE redemption, status
//! lookup, and execution-state finalization.

use serde::{Deserialize, Serialize};
use tansive_catalog::SessionStatusSummary;
use tansive_policy::ViewDef;

use crate::error::TangentResult;
use crate::signing::TangentIdentity;

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Deserialize)]
pub struct ExchangeResponse {
    pub token: String,
    pub session_id: uuid::Uuid,
    pub skillset_path: String,
    pub skill_name: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    view_def: Option<ViewDef>,
}

#[derive(Serialize)]
struct ExecutionStateRequest<'a> {
    session_id: uuid::Uuid,
    status_summary: SessionStatusSummary,
    status: &'a serde_json::Value,
}

/// Talks to the Catalog Server on the tangent's behalf. Requests that carry a bearer use it
/// directly; TG-originated requests (execution-state) are instead Ed25519-signed when an
/// identity is configured, per the request-signing middleware.
pub struct CatalogServerClient {
    http: reqwest::Client,
    base_url: String,
    identity: Option<TangentIdentity>,
}

impl CatalogServerClient {
    pub fn new(base_url: impl Into<String>, identity: Option<TangentIdentity>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), identity }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `POST /sessions/exchange` — redeem the one-time auth code for a session bearer.
    pub async fn exchange(&self, auth_code: &str, code_verifier: &str) -> TangentResult<ExchangeResponse> {
        let response = self
            .http
            .post(self.url("/sessions/exchange"))
            .json(&ExchangeRequest { auth_code, code_verifier })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(crate::error::TangentError::new(
                crate::error::ErrorCode::UpstreamError,
                format!("session exchange failed with status {}", response.status()),
            ));
        }
        Ok(response.json().await?)
    }

    /// `GET /status` with the session bearer — resolves the full view definition the redeemed
    /// token only carries the id/label for.
    pub async fn fetch_view(&self, bearer: &str) -> TangentResult<ViewDef> {
        let response = self.http.get(self.url("/status")).bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::TangentError::new(
                crate::error::ErrorCode::UpstreamError,
                format!("status lookup failed with status {}", response.status()),
            ));
        }
        let status: StatusResponse = response.json().await?;
        status.view_def.ok_or_else(|| crate::error::TangentError::unauthorized("session bearer carries no adopted view"))
    }

    /// `POST /sessions/execution-state` — TG → CS finalization. Signed
    /// with the tangent's identity when one is configured; best-effort otherwise, matching "on
    /// any failure the local session still exits".
    pub async fn report_execution_state(
        &self,
        session_id: uuid::Uuid,
        status_summary: SessionStatusSummary,
        status: &serde_json::Value,
    ) -> TangentResult<()> {
        let path = "/sessions/execution-state";
        // Serialize the body once so the exact bytes that get signed are the exact bytes sent on
        // the wire — the server verifies the signature against the bytes it actually received.
        let body = serde_json::to_vec(&ExecutionStateRequest { session_id, status_summary, status })?;
        let mut request = self.http.post(self.url(path)).header("content-type", "application/json");

        if let Some(identity) = &self.identity {
            let signed = identity.sign("POST", path, None, &body);
            request = request
                .header("X-TangentID", signed.tangent_id)
                .header("X-Tangent-Signature-Timestamp", signed.timestamp)
                .header("X-Tangent-Signature", signed.signature);
        }

        let response = request.body(body).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::TangentError::new(
                crate::error::ErrorCode::UpstreamError,
                format!("execution-state report failed with status {}", response.status()),
            ));
        }
        Ok(())
    }
}
