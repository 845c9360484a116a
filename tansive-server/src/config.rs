//! Catalog Server configuration, loaded from the environment with typed defaults.
//!
//! Every variable is optional, has a sane development default, and parsing never panics on a
//! malformed value (it falls back to the default instead).

use std::time::Duration;

/// Runtime configuration for the Catalog Server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` the HTTP listener binds to.
    pub bind_addr: String,

    /// Advertised `iss`/`host:port` claim minted into tokens.
    pub issuer: String,

    /// Password used to encrypt the active signing key's private half at rest.
    pub signing_key_password: String,

    /// Identity token lifetime.
    pub token_lifetime: Duration,

    /// PKCE auth-code lifetime.
    pub auth_code_ttl: Duration,

    /// Default session lifetime (`ExpiresAt`), absent an explicit request override.
    pub session_ttl: Duration,

    /// Single-user mode: enables `/auth/login` and unauthenticated `/tangents` onboarding.
    pub single_user_mode: bool,

    /// Bearer token that stands in for a real identity in single-user test mode.
    pub test_token: Option<String>,

    /// Shared secret a tangent's `POST /tangents` onboarding call must present.
    pub onboarding_key: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("TANSIVE_SERVER_BIND").unwrap_or_else(|_| "0.0.0.0:8443".to_string());
        let issuer = std::env::var("TANSIVE_ISSUER").unwrap_or_else(|_| bind_addr.clone());

        let signing_key_password = std::env::var("TANSIVE_SIGNING_KEY_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("TANSIVE_SIGNING_KEY_PASSWORD not set; using an insecure development default");
            "dev-only-insecure-password".to_string()
        });

        let token_lifetime_secs = std::env::var("TANSIVE_TOKEN_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let auth_code_ttl_secs = std::env::var("TANSIVE_AUTH_CODE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        let session_ttl_secs = std::env::var("TANSIVE_SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let single_user_mode = std::env::var("TANSIVE_SINGLE_USER_MODE")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let test_token = std::env::var("TANSIVE_TEST_TOKEN").ok();

        let onboarding_key = std::env::var("TANSIVE_ONBOARDING_KEY").unwrap_or_else(|_| "dev-onboarding-key".to_string());

        Self {
            bind_addr,
            issuer,
            signing_key_password,
            token_lifetime: Duration::from_secs(token_lifetime_secs),
            auth_code_ttl: Duration::from_secs(auth_code_ttl_secs),
            session_ttl: Duration::from_secs(session_ttl_secs),
            single_user_mode,
            test_token,
            onboarding_key,
        }
    }

    /// Refuse to boot with a development-grade secret outside single-user/dev mode.
    pub fn validate_for_production(&self) -> Result<(), String> {
        if self.single_user_mode {
            return Ok(());
        }
        if self.signing_key_password == "dev-only-insecure-password" {
            return Err("refusing to start in multi-user mode with the default signing key password".to_string());
        }
        if self.onboarding_key == "dev-onboarding-key" {
            return Err("refusing to start in multi-user mode with the default onboarding key".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_single_user_and_dev_safe() {
        let cfg = ServerConfig { signing_key_password: "dev-only-insecure-password".to_string(), ..from_env_like() };
        assert!(cfg.validate_for_production().is_ok());
    }

    #[test]
    fn multi_user_mode_rejects_default_secrets() {
        let mut cfg = from_env_like();
        cfg.single_user_mode = false;
        assert!(cfg.validate_for_production().is_err());
    }

    fn from_env_like() -> ServerConfig {
        ServerConfig {
            bind_addr: "0.0.0.0:8443".to_string(),
            issuer: "localhost:8443".to_string(),
            signing_key_password: "dev-only-insecure-password".to_string(),
            token_lifetime: Duration::from_secs(3600),
            auth_code_ttl: Duration::from_secs(600),
            session_ttl: Duration::from_secs(3600),
            single_user_mode: true,
            test_token: None,
            onboarding_key: "dev-onboarding-key".to_string(),
        }
    }
}
