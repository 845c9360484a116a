//! Persisted CLI context: server URL, the caller's current bearer token, and the
//! catalog/variant/namespace the `--catalog`/`--variant`/`--namespace` flags default from.
//! Stored as a single flat JSON file under the OS config directory, since the CLI has no
//! long-running UI state to persist.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub catalog: Option<String>,
    pub variant: Option<String>,
    pub namespace: Option<String>,
}

impl CliConfig {
    fn path() -> CliResult<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "tansive", "tansive")
            .ok_or_else(|| CliError::Config("could not determine a config directory for this platform".to_string()))?;
        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load the persisted config, or an empty default if none exists yet.
    pub fn load() -> CliResult<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    pub fn save(&self) -> CliResult<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn server_url(&self) -> String {
        self.server_url.clone().unwrap_or_else(|| "http://localhost:8443".to_string())
    }

    pub fn require_token(&self) -> CliResult<&str> {
        self.token.as_deref().ok_or(CliError::NotLoggedIn)
    }

    /// Resolve the effective catalog for a command, preferring an explicit CLI flag over the
    /// persisted default.
    pub fn require_catalog<'a>(&'a self, flag: &'a Option<String>) -> CliResult<&'a str> {
        flag.as_deref().or(self.catalog.as_deref()).ok_or(CliError::NoCatalog)
    }
}
