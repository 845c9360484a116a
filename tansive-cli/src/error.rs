//! CLI error type. Every command returns a `CliResult`; `main` maps any `Err` to exit code 1.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("not logged in; run `tansive login` first")]
    NotLoggedIn,

    #[error("no catalog selected; run `tansive set-catalog <name>` or pass --catalog")]
    NoCatalog,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}: {message}")]
    Api { url: String, status: u16, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid YAML/JSON manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
