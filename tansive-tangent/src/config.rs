//! Tangent configuration, loaded from the environment. Mirrors
//! `tansive_server::config::ServerConfig::from_env`'s shape: optional variables, dev-safe
//! defaults, no panics on malformed input.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TangentConfig {
    /// `host:port` the tangent's HTTP listener (MCP bridge, session bootstrap) binds to.
    pub bind_addr: String,

    /// Base URL of the Catalog Server this tangent reports to.
    pub catalog_server_url: String,

    /// Path of the local Unix socket skill processes use for sub-tool calls.
    pub socket_path: PathBuf,

    /// Identity this tangent presents as `X-TangentID` when signing requests to CS.
    pub tangent_id: Option<String>,

    /// Ed25519 private key (32 raw bytes, hex-encoded) used to sign outgoing requests to CS.
    /// Absent in single-user/dev deployments that rely on onboarding instead.
    pub signing_key_hex: Option<String>,

    /// Max call-graph depth per session.
    pub max_call_depth: usize,

    /// Window the finalization path waits for the hash-log writer to close.
    pub finalization_timeout: Duration,
}

impl TangentConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("TANSIVE_TANGENT_BIND").unwrap_or_else(|_| "0.0.0.0:8470".to_string());
        let catalog_server_url = std::env::var("TANSIVE_CATALOG_SERVER_URL").unwrap_or_else(|_| "http://localhost:8443".to_string());
        let socket_path = std::env::var("TANSIVE_TANGENT_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp/tansive-tangent.sock"));
        let tangent_id = std::env::var("TANSIVE_TANGENT_ID").ok();
        let signing_key_hex = std::env::var("TANSIVE_TANGENT_SIGNING_KEY").ok();
        let max_call_depth = std::env::var("TANSIVE_MAX_CALL_DEPTH").ok().and_then(|s| s.parse().ok()).unwrap_or(32);
        let finalization_timeout_secs =
            std::env::var("TANSIVE_FINALIZATION_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        Self {
            bind_addr,
            catalog_server_url,
            socket_path,
            tangent_id,
            signing_key_hex,
            max_call_depth,
            finalization_timeout: Duration::from_secs(finalization_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_dev_safe_and_unsigned() {
        // Constructing directly rather than touching process env, which tests must not mutate
        // concurrently.
        let cfg = TangentConfig {
            bind_addr: "0.0.0.0:8470".to_string(),
            catalog_server_url: "http://localhost:8443".to_string(),
            socket_path: PathBuf::from("/tmp/tansive-tangent.sock"),
            tangent_id: None,
            signing_key_hex: None,
            max_call_depth: 32,
            finalization_timeout: Duration::from_secs(10),
        };
        assert!(cfg.signing_key_hex.is_none());
        assert_eq!(cfg.max_call_depth, 32);
    }
}
