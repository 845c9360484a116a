//! Shared application state for the Catalog Server's Axum router.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use tansive_catalog::InMemoryCatalog;
use tansive_core::{ProjectId, TenantId};
use tansive_policy::PolicyEngine;
use tansive_session::SessionManager;
use tansive_tokens::{TokenClock, TokenService};

use crate::config::ServerConfig;

/// Application-wide state shared across all routes.
///
/// This deployment profile is single-tenant/single-user: one fixed
/// `tenant_id`/`project_id` stands in for the multi-tenant row model the repositories otherwise
/// support.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InMemoryCatalog>,
    pub sessions: Arc<SessionManager>,
    pub tokens: Arc<TokenService>,
    pub policy: PolicyEngine,
    pub clock: Arc<dyn TokenClock>,
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub start_time: Instant,
    pub server_version: &'static str,
    pub config: Arc<ServerConfig>,
}

crate::impl_from_ref!(Arc<InMemoryCatalog>, store);
crate::impl_from_ref!(Arc<SessionManager>, sessions);
crate::impl_from_ref!(Arc<TokenService>, tokens);
