//! API error taxonomy for the Catalog Server.
//!
//! A single `ApiError`/`ErrorCode` pair keyed to the control plane's own error kinds
//! (InvalidRequest, Unauthorized/InvalidToken, DisallowedByPolicy, NotFound, AlreadyExists,
//! InvalidSchema/ValidationError, IntegrityError, EncryptionError, UpstreamError), each mapped
//! to an HTTP status so every route handler can return one error type.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};
use std::fmt;
use tansive_core::{CatalogError, CoreError, CryptoError, RuntimeError, SessionError, TokenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    Unauthorized,
    InvalidToken,
    DisallowedByPolicy,
    NotFound,
    AlreadyExists,
    InvalidSchema,
    ValidationError,
    IntegrityError,
    EncryptionError,
    UpstreamError,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidSchema | ErrorCode::ValidationError => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::Unauthorized | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::DisallowedByPolicy => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::IntegrityError | ErrorCode::EncryptionError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// `{result: "error", error: {code, message}}` .
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{entity} '{id}' not found"))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    result: &'a str,
    error: &'a ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = Json(ErrorEnvelope { result: "error", error: &self });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { entity, id } => ApiError::new(ErrorCode::NotFound, format!("{entity} '{id}' not found")),
            CatalogError::AlreadyExists { entity, name } => {
                ApiError::new(ErrorCode::AlreadyExists, format!("{entity} '{name}' already exists"))
            }
            CatalogError::InvalidName { name, reason } => {
                ApiError::new(ErrorCode::InvalidRequest, format!("invalid name '{name}': {reason}"))
            }
            CatalogError::StillReferenced { hash, refs } => ApiError::new(
                ErrorCode::InvalidRequest,
                format!("object '{hash}' still referenced by {refs} entries"),
            ),
            CatalogError::SessionAlreadyFinalized { id } => {
                ApiError::new(ErrorCode::InvalidRequest, format!("session '{id}' is already finalized"))
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidAuthCode | SessionError::AuthCodeExpired | SessionError::AuthCodeVerifierMismatch => {
                ApiError::new(ErrorCode::Unauthorized, err.to_string())
            }
            SessionError::ViewNotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            SessionError::AdoptionDenied { .. } => ApiError::new(ErrorCode::DisallowedByPolicy, err.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::NotYetValid | TokenError::InvalidSignature | TokenError::Malformed { .. } => {
                ApiError::new(ErrorCode::InvalidToken, err.to_string())
            }
            _ => ApiError::new(ErrorCode::InternalError, err.to_string()),
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        ApiError::new(ErrorCode::InternalError, err.to_string())
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        ApiError::new(ErrorCode::EncryptionError, err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Policy(e) => ApiError::new(ErrorCode::DisallowedByPolicy, e.to_string()),
            CoreError::Token(e) => e.into(),
            CoreError::Catalog(e) => e.into(),
            CoreError::Session(e) => e.into(),
            CoreError::Runtime(e) => e.into(),
            CoreError::Crypto(e) => e.into(),
            CoreError::Hashlog(e) => ApiError::new(ErrorCode::IntegrityError, e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, format!("invalid JSON: {err}"))
    }
}

impl From<serde_yaml::Error> for ApiError {
    fn from(err: serde_yaml::Error) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, format!("invalid YAML: {err}"))
    }
}
