//! Tangent entry point: bootstraps configuration, the Catalog Server client, and both of the
//! tangent's listeners — the HTTP surface (`/session/start`, `/session/mcp`, `/session/end`) and
//! the local Unix socket skill processes use for sub-tool calls.

use std::net::SocketAddr;
use std::sync::Arc;

use tansive_tangent::client::CatalogServerClient;
use tansive_tangent::config::TangentConfig;
use tansive_tangent::sessions::SessionRegistry;
use tansive_tangent::signing::TangentIdentity;
use tansive_tangent::{telemetry, TangentState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(TangentConfig::from_env());
    telemetry::init(true);

    let identity = match (&config.tangent_id, &config.signing_key_hex) {
        (Some(id), Some(key_hex)) => Some(TangentIdentity::from_hex(id.clone(), key_hex).map_err(|e| format!("invalid tangent signing key: {e}"))?),
        _ => {
            tracing::warn!("no tangent signing identity configured; execution-state reports will be unsigned");
            None
        }
    };

    let cs_client = Arc::new(CatalogServerClient::new(config.catalog_server_url.clone(), identity));
    let sessions = Arc::new(SessionRegistry::new());

    let state = TangentState { config: config.clone(), cs_client, sessions: sessions.clone() };
    let app = tansive_tangent::build_router(state);

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| format!("invalid TANSIVE_TANGENT_BIND '{}': {e}", config.bind_addr))?;
    tracing::info!(%addr, "starting tansive-tangent http surface");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let http_server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());

    tracing::info!(socket_path = %config.socket_path.display(), "starting tansive-tangent skill socket");
    let socket_listener = tansive_tangent::socket::bind_listener(&config.socket_path).await?;
    let socket_server = tansive_tangent::socket::serve(socket_listener, sessions);

    tokio::select! {
        result = http_server => {
            result.map_err(|e| format!("http server error: {e}"))?;
        }
        _ = socket_server => {
            tracing::error!("skill socket listener exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    let _ = tokio::fs::remove_file(&config.socket_path).await;
    Ok(())
}
