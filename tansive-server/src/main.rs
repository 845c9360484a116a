//! Catalog Server entry point: bootstraps configuration, the in-memory catalog store, the
//! signing-key cache, and the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tansive_catalog::{InMemoryCatalog, TenantRepository};
use tansive_core::{EntityIdType, ProjectId, TenantId};
use tansive_policy::PolicyEngine;
use tansive_server::config::ServerConfig;
use tansive_server::state::AppState;
use tansive_server::{telemetry, ApiError, ApiResult, ErrorCode};
use tansive_session::SessionManager;
use tansive_tokens::{SigningKeyCache, SystemClock, TokenService};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = Arc::new(ServerConfig::from_env());
    telemetry::init(config.single_user_mode);

    if let Err(reason) = config.validate_for_production() {
        return Err(ApiError::new(ErrorCode::InternalError, reason));
    }

    let store = Arc::new(InMemoryCatalog::new());

    // Single-tenant/single-user deployment profile: one fixed tenant/project stands
    // in for the multi-tenant row model the repositories otherwise support.
    let tenant_id = TenantId::new_v4();
    let project_id = ProjectId::new_v4();
    store
        .create_tenant(tansive_catalog::Tenant { id: tenant_id, name: "default".to_string() })
        .await
        .map_err(tansive_core::CoreError::Catalog)?;

    let signing_keys = Arc::new(SigningKeyCache::new(store.clone(), config.signing_key_password.clone()));
    let clock = Arc::new(SystemClock) as Arc<dyn tansive_tokens::TokenClock>;
    let tokens = Arc::new(TokenService::new(signing_keys, clock.clone(), config.issuer.clone(), config.token_lifetime.as_secs() as i64));

    let sessions = Arc::new(SessionManager::new(store.clone(), store.clone(), store.clone(), store.clone(), tokens.clone()));

    let state = AppState {
        store,
        sessions,
        tokens,
        policy: PolicyEngine::new(),
        clock,
        tenant_id,
        project_id,
        start_time: Instant::now(),
        server_version: env!("CARGO_PKG_VERSION"),
        config: config.clone(),
    };

    let app: Router = tansive_server::build_router(state);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| ApiError::new(ErrorCode::InvalidRequest, format!("invalid TANSIVE_SERVER_BIND '{}': {e}", config.bind_addr)))?;
    tracing::info!(%addr, "starting tansive-server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::new(ErrorCode::InternalError, format!("failed to bind {addr}: {e}")))?;

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::new(ErrorCode::InternalError, format!("server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
