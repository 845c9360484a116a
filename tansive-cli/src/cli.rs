//! Command-line surface: login, adopt views, manage catalog objects, run sessions. Built on
//! `clap`'s derive API (see DESIGN.md for the rationale behind a flag-based CLI here).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tansive", version, about = "Control-plane CLI: login, adopt views, manage catalog objects, run sessions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Catalog to scope this command to (overrides the persisted default).
    #[arg(long, short = 'c', global = true)]
    pub catalog: Option<String>,

    /// Variant to scope this command to (overrides the persisted default).
    #[arg(long, short = 'v', global = true)]
    pub variant: Option<String>,

    /// Namespace to scope this command to (overrides the persisted default).
    #[arg(long, short = 'n', global = true)]
    pub namespace: Option<String>,

    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// When applying multiple manifest documents, continue past a failing document instead of
    /// stopping at the first error (the overall exit code is still 1 if any document failed).
    #[arg(long, short = 'i', global = true)]
    pub ignore_errors: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in (single-user mode) and persist the issued identity token.
    Login {
        /// Catalog server base URL; persisted for subsequent commands.
        #[arg(long)]
        server: Option<String>,
    },

    /// Show or edit the persisted CLI configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Persist a default catalog for subsequent commands.
    SetCatalog { name: String },

    /// Clear the persisted default catalog.
    UnsetCatalog,

    /// Adopt a view and persist the resulting scoped token.
    AdoptView {
        /// View label to adopt; omit to adopt the catalog's implicit default-admin view.
        label: Option<String>,
    },

    /// Create a new object from a YAML/JSON manifest (fails if it already exists).
    Create {
        #[arg(long, short = 'f')]
        file: PathBuf,
    },

    /// Create-or-update a YAML/JSON manifest; falls back to `PUT` when the object already exists.
    Apply {
        #[arg(long, short = 'f')]
        file: PathBuf,
    },

    /// Fetch a single object by kind and name.
    Get { kind: String, name: String },

    /// Replace an existing object from a manifest file.
    Put {
        kind: String,
        name: String,
        #[arg(long, short = 'f')]
        file: PathBuf,
    },

    /// Delete an object by kind and name.
    Delete { kind: String, name: String },

    /// List objects of a kind under the current scope.
    List { kind: String },

    /// Print a path-grouped tree of objects of a kind under the current scope.
    Tree { kind: String },

    /// Print server identity and the caller's currently adopted view.
    Status,

    /// Session-scoped operations.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Print the CLI version.
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the persisted configuration.
    Show,
    /// Point the CLI at a different catalog server.
    SetServer { url: String },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a session against a skillset+skill under the current view.
    Create {
        #[arg(long)]
        skillset: String,
        #[arg(long)]
        skill: String,
        #[arg(long)]
        tangent_id: uuid::Uuid,
        #[arg(long, default_value = "cli-user")]
        user_id: String,
    },
}
