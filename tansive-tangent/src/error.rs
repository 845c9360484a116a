//! Error taxonomy for the tangent's HTTP and socket surfaces.
//!
//! Mirrors `tansive-server::error::ApiError`'s `{result, error}` envelope and `ErrorCode` set so a
//! caller sees the same error shape regardless of which half of the control plane answered.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use tansive_core::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    Unauthorized,
    NotFound,
    DisallowedByPolicy,
    UpstreamError,
    InternalError,
}

impl ErrorCode {
    fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DisallowedByPolicy => StatusCode::FORBIDDEN,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TangentError {
    pub code: ErrorCode,
    pub message: String,
}

impl TangentError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }
}

impl fmt::Display for TangentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for TangentError {}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    result: &'a str,
    error: &'a TangentError,
}

impl IntoResponse for TangentError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        (status, Json(ErrorEnvelope { result: "error", error: &self })).into_response()
    }
}

pub type TangentResult<T> = Result<T, TangentError>;

impl From<RuntimeError> for TangentError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::BlockedByPolicy { .. } => TangentError::new(ErrorCode::DisallowedByPolicy, err.to_string()),
            RuntimeError::InvalidInvocationId { .. } => TangentError::invalid_request(err.to_string()),
            RuntimeError::SkillsetNotFound { .. } | RuntimeError::SkillNotFound { .. } => TangentError::not_found(err.to_string()),
            RuntimeError::UpstreamError { .. } => TangentError::new(ErrorCode::UpstreamError, err.to_string()),
            _ => TangentError::new(ErrorCode::InternalError, err.to_string()),
        }
    }
}

impl From<reqwest::Error> for TangentError {
    fn from(err: reqwest::Error) -> Self {
        TangentError::new(ErrorCode::UpstreamError, err.to_string())
    }
}

impl From<serde_json::Error> for TangentError {
    fn from(err: serde_json::Error) -> Self {
        TangentError::invalid_request(format!("invalid JSON: {err}"))
    }
}
