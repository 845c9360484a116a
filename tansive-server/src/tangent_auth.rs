//! Request-signing verification for Tangent → Catalog Server requests.
//!
//! A typed `FromRequest` extractor, verifying an Ed25519 signature over a canonical string
//! instead of a bearer JWT. The canonical string covers method/path/query/body/timestamp — it is
//! a body-consuming extractor rather than `FromRequestParts` specifically so the raw body can be
//! folded into the signed bytes; the body is re-exposed on `TangentAuth` so the route handler can
//! still deserialize it.

use axum::body::Bytes;
use axum::extract::{FromRef, FromRequest, Request};
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine as _;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tansive_catalog::TangentRepository;
use tansive_core::TangentId;

use crate::error::ApiError;
use crate::state::AppState;

/// Replay-protection window: the `X-Tangent-Signature-Timestamp` header must fall within this
/// many seconds of the server's clock.
const TIMESTAMP_SKEW_SECS: i64 = 60;

/// A verified tangent identity, extracted from the tangent-signed request headers. Carries the
/// raw request body alongside the verified identity since this extractor consumed it.
pub struct TangentAuth {
    pub tangent_id: TangentId,
    pub body: Bytes,
}

impl<S> FromRequest<S> for TangentAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|_| ApiError::invalid_request("failed to read request body"))?;

        let header = |name: &str| -> Option<String> { parts.headers.get(name).and_then(|h| h.to_str().ok()).map(str::to_string) };

        let tangent_id: TangentId = header("X-TangentID")
            .ok_or_else(|| ApiError::unauthorized("missing X-TangentID header"))?
            .parse()
            .map_err(|_| ApiError::unauthorized("X-TangentID is not a valid tangent id"))?;
        let timestamp = header("X-Tangent-Signature-Timestamp")
            .ok_or_else(|| ApiError::unauthorized("missing X-Tangent-Signature-Timestamp header"))?;
        let signature_b64 =
            header("X-Tangent-Signature").ok_or_else(|| ApiError::unauthorized("missing X-Tangent-Signature header"))?;

        let ts = chrono::DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|_| ApiError::unauthorized("signature timestamp is not valid RFC3339"))?
            .with_timezone(&chrono::Utc);
        let now = chrono::Utc::now();
        if (now - ts).num_seconds().abs() > TIMESTAMP_SKEW_SECS {
            return Err(ApiError::unauthorized("signature timestamp is outside the freshness window"));
        }

        let tangent = app_state
            .store
            .get_tangent(tangent_id)
            .await
            .map_err(|_| ApiError::unauthorized("unknown tangent"))?;
        let public_key =
            VerifyingKey::from_bytes(&tangent.public_key_access).map_err(|_| ApiError::unauthorized("tangent public key is malformed"))?;

        let mut canonical = Vec::with_capacity(body.len() + 64);
        canonical.extend_from_slice(parts.method.as_str().as_bytes());
        canonical.push(b'\n');
        canonical.extend_from_slice(parts.uri.path().as_bytes());
        canonical.push(b'\n');
        canonical.extend_from_slice(parts.uri.query().unwrap_or("").as_bytes());
        canonical.push(b'\n');
        canonical.extend_from_slice(&body);
        canonical.push(b'\n');
        canonical.extend_from_slice(timestamp.as_bytes());

        let sig_bytes = BASE64URL
            .decode(signature_b64.as_bytes())
            .map_err(|_| ApiError::unauthorized("signature is not valid base64url"))?;
        let sig_array: [u8; 64] = sig_bytes.try_into().map_err(|_| ApiError::unauthorized("signature must be 64 bytes"))?;
        let signature = Signature::from_bytes(&sig_array);
        public_key
            .verify(&canonical, &signature)
            .map_err(|_| ApiError::unauthorized("tangent signature verification failed"))?;

        Ok(TangentAuth { tangent_id, body })
    }
}
