//! Command implementations. Each takes the parsed `Cli`, the loaded `CliConfig`, and an
//! `ApiClient`, and returns the JSON value the caller should print, either as formatted text
//! or raw JSON when `--json` is set.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::cli::{Cli, Commands, ConfigAction, SessionAction};
use crate::client::ApiClient;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Generate a fresh (verifier, challenge) pair for a session's PKCE handoff, matching
/// `tansive_session::pkce`'s `challenge_from_verifier` exactly so a real tangent redeeming
/// this code would succeed.
fn new_pkce_pair() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let verifier = BASE64URL.encode(bytes);
    let challenge = BASE64URL.encode(Sha256::digest(verifier.as_bytes()));
    (verifier, challenge)
}

fn scope_params<'a>(catalog: Option<&'a str>, variant: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
    let mut params = Vec::new();
    if let Some(c) = catalog {
        params.push(("catalog", c));
    }
    if let Some(v) = variant {
        params.push(("variant", v));
    }
    params
}

/// A single parsed manifest document, tagged with the `kind` field every manifest carries.
struct Manifest {
    kind: String,
    body: Value,
}

fn parse_manifests(raw: &str) -> CliResult<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(raw) {
        let value = Value::deserialize(doc).map_err(|e| CliError::Manifest(e.to_string()))?;
        if value.is_null() {
            continue;
        }
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| CliError::Manifest("manifest is missing a 'kind' field".to_string()))?
            .to_string();
        manifests.push(Manifest { kind, body: value });
    }
    Ok(manifests)
}

pub async fn run(cli: &Cli, mut config: CliConfig) -> CliResult<Value> {
    let client = ApiClient::new(config.server_url(), config.token.clone());
    let catalog = config.catalog.clone();
    let variant = config.variant.clone();

    match &cli.command {
        Commands::Login { server } => {
            if let Some(server) = server {
                config.server_url = Some(server.clone());
            }
            let client = ApiClient::new(config.server_url(), None);
            let response = client.login().await?;
            config.token = response.get("token").and_then(|t| t.as_str()).map(str::to_string);
            config.save()?;
            Ok(response)
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => Ok(serde_json::to_value(&config)?),
            ConfigAction::SetServer { url } => {
                config.server_url = Some(url.clone());
                config.save()?;
                Ok(json!({ "server_url": url }))
            }
        },

        Commands::SetCatalog { name } => {
            config.catalog = Some(name.clone());
            config.save()?;
            Ok(json!({ "catalog": name }))
        }

        Commands::UnsetCatalog => {
            config.catalog = None;
            config.variant = None;
            config.namespace = None;
            config.save()?;
            Ok(json!({ "catalog": Value::Null }))
        }

        Commands::AdoptView { label } => {
            config.require_token()?;
            let catalog = config.require_catalog(&cli.catalog)?.to_string();
            let response = match label {
                Some(label) => client.adopt_labeled_view(&catalog, label).await?,
                None => client.adopt_default_view(&catalog).await?,
            };
            config.token = response.get("token").and_then(|t| t.as_str()).map(str::to_string);
            config.save()?;
            Ok(response)
        }

        Commands::Create { file } => {
            config.require_token()?;
            let raw = std::fs::read_to_string(file)?;
            let manifests = parse_manifests(&raw)?;
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            let mut results = Vec::new();
            for m in manifests {
                match client.create(&format!("{}s", m.kind), &scope, &m.body).await {
                    Ok(v) => results.push(v),
                    Err(e) if cli.ignore_errors => results.push(json!({ "error": e.to_string() })),
                    Err(e) => return Err(e),
                }
            }
            Ok(Value::Array(results))
        }

        Commands::Apply { file } => {
            config.require_token()?;
            let raw = std::fs::read_to_string(file)?;
            let manifests = parse_manifests(&raw)?;
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            let mut results = Vec::new();
            for m in manifests {
                let kind_plural = format!("{}s", m.kind);
                let name = manifest_name(&m.body);
                let outcome = match client.create(&kind_plural, &scope, &m.body).await {
                    Ok(v) => Ok(v),
                    Err(CliError::Api { status: 409, .. }) => match name {
                        Some(name) => client.put(&kind_plural, &name, &scope, &m.body).await,
                        None => Err(CliError::Manifest("manifest conflicts with an existing object but carries no name/label to PUT".to_string())),
                    },
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(v) => results.push(v),
                    Err(e) if cli.ignore_errors => results.push(json!({ "error": e.to_string() })),
                    Err(e) => return Err(e),
                }
            }
            Ok(Value::Array(results))
        }

        Commands::Get { kind, name } => {
            config.require_token()?;
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            client.get(kind, name, &scope).await
        }

        Commands::Put { kind, name, file } => {
            config.require_token()?;
            let raw = std::fs::read_to_string(file)?;
            let body: Value = if file.extension().and_then(|e| e.to_str()) == Some("json") {
                serde_json::from_str(&raw)?
            } else {
                serde_yaml::from_str(&raw).map_err(|e| CliError::Manifest(e.to_string()))?
            };
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            client.put(kind, name, &scope, &body).await
        }

        Commands::Delete { kind, name } => {
            config.require_token()?;
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            client.delete(kind, name, &scope).await?;
            Ok(json!({ "deleted": name }))
        }

        Commands::List { kind } => {
            config.require_token()?;
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            client.list(kind, &scope).await
        }

        Commands::Tree { kind } => {
            config.require_token()?;
            let scope = scope_params(catalog.as_deref(), variant.as_deref());
            let listed = client.list(kind, &scope).await?;
            Ok(build_tree(&listed))
        }

        Commands::Status => {
            config.require_token()?;
            client.status().await
        }

        Commands::Session { action } => match action {
            SessionAction::Create { skillset, skill, tangent_id, user_id } => {
                config.require_token()?;
                let (verifier, challenge) = new_pkce_pair();
                let body = json!({
                    "skillset_path": skillset,
                    "skill_name": skill,
                    "tangent_id": tangent_id,
                    "user_id": user_id,
                    "code_challenge": challenge,
                });
                let mut response = client.create_session(&body).await?;
                if let Value::Object(map) = &mut response {
                    map.insert("code_verifier".to_string(), Value::String(verifier));
                }
                Ok(response)
            }
        },

        Commands::Version => Ok(json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn manifest_name(body: &Value) -> Option<String> {
    body.get("name")
        .or_else(|| body.get("label"))
        .or_else(|| body.get("path"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Group a flat listing of `/`-separated paths into a nested JSON tree for the `tree` command.
/// Only the grouping lives here, not a rendered diagram.
fn build_tree(listed: &Value) -> Value {
    let mut root = serde_json::Map::new();
    let Value::Array(items) = listed else { return listed.clone() };
    for item in items {
        let path = match item {
            Value::String(s) => s.clone(),
            Value::Object(o) => o.get("name").and_then(|n| n.as_str()).unwrap_or_default().to_string(),
            _ => continue,
        };
        let mut node = &mut root;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (i, segment) in segments.iter().enumerate() {
            let is_leaf = i == segments.len() - 1;
            let entry = node.entry(segment.to_string()).or_insert_with(|| if is_leaf { Value::Null } else { json!({}) });
            if !is_leaf {
                if !entry.is_object() {
                    *entry = json!({});
                }
                node = entry.as_object_mut().unwrap();
            }
        }
    }
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_pair_matches_session_crate_derivation() {
        let (verifier, challenge) = new_pkce_pair();
        let expected = BASE64URL.encode(Sha256::digest(verifier.as_bytes()));
        assert_eq!(challenge, expected);
    }

    #[test]
    fn tree_groups_paths_by_segment() {
        let listed = json!(["/demo/agent", "/demo/other", "/top"]);
        let tree = build_tree(&listed);
        assert!(tree.get("demo").unwrap().get("agent").is_some());
        assert!(tree.get("top").is_some());
    }

    #[test]
    fn parse_manifests_splits_multi_doc_yaml() {
        let raw = "kind: catalog\nname: a\n---\nkind: view\nlabel: b\n";
        let manifests = parse_manifests(raw).unwrap();
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].kind, "catalog");
        assert_eq!(manifests[1].kind, "view");
    }
}
