//! Tangent runtime: per-session skill execution (`tansive-runtime`), the HTTP surface a client
//! uses to bootstrap and drive a session, and the local Unix socket skill processes use for
//! sub-tool calls.

pub mod client;
pub mod config;
pub mod error;
pub mod routes;
pub mod sessions;
pub mod signing;
pub mod socket;
pub mod state;
pub mod telemetry;

pub use error::{ErrorCode, TangentError, TangentResult};
pub use routes::build_router;
pub use state::TangentState;
