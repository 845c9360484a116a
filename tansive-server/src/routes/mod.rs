//! Route wiring for the Catalog Server: per-entity routers nested onto one top-level `Router`.

pub mod auth;
pub mod kind;
pub mod sessions;
pub mod status;
pub mod tangents;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Assemble the full Catalog Server router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/default-view-adoptions/:catalog", post(auth::adopt_default_view))
        .route("/auth/view-adoptions/:catalog/:label", post(auth::adopt_labeled_view))
        .route("/status", get(status::status))
        .route("/tangents", post(tangents::register))
        .route("/sessions", post(sessions::create))
        .route("/sessions/exchange", post(sessions::exchange))
        .route("/sessions/execution-state", post(sessions::execution_state))
        .route("/:kind", post(kind::create).get(kind::list))
        .route("/:kind/*name", get(kind::get).put(kind::put).delete(kind::delete))
        .with_state(state)
}
