//! Catalog Server HTTP surface: auth/view-adoption, catalog/variant/namespace/view CRUD,
//! resource/skillset object storage, tangent onboarding, and session lifecycle.

pub mod auth;
pub mod config;
pub mod error;
pub mod macros;
pub mod routes;
pub mod state;
pub mod tangent_auth;
pub mod telemetry;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::build_router;
pub use state::AppState;
