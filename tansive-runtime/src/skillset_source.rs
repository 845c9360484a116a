//! Fetches and caches skillset definitions for a running session.
//!
//! Skillsets are fetched over HTTP lazily, on first use. `SkillsetSource` abstracts that fetch
//! so the runtime's policy/dispatch logic never depends on the transport, and a fixture
//! implementation can stand in for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tansive_catalog::Skillset;
use tansive_core::RuntimeError;

#[async_trait]
pub trait SkillsetSource: Send + Sync {
    async fn fetch_skillset(&self, path: &str) -> Result<Skillset, RuntimeError>;
}

/// Fetches a skillset from the catalog server's `GET /skillsets/{path}` endpoint.
pub struct HttpSkillsetSource {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
    catalog_name: String,
    variant_name: String,
}

impl HttpSkillsetSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        bearer_token: impl Into<String>,
        catalog_name: impl Into<String>,
        variant_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            catalog_name: catalog_name.into(),
            variant_name: variant_name.into(),
        }
    }
}

#[async_trait]
impl SkillsetSource for HttpSkillsetSource {
    async fn fetch_skillset(&self, path: &str) -> Result<Skillset, RuntimeError> {
        let url = format!("{}/skillsets/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("catalog", &self.catalog_name), ("variant", &self.variant_name)])
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| RuntimeError::UpstreamError { status: 0, message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::UpstreamError { status: status.as_u16(), message: format!("fetching skillset '{path}' failed") });
        }

        response
            .json()
            .await
            .map_err(|e| RuntimeError::UpstreamError { status: status.as_u16(), message: e.to_string() })
    }
}

/// Wraps any [`SkillsetSource`] with an in-memory, read-through cache keyed by skillset path —
/// one network round trip per path for the lifetime of the session, matching "fetched over HTTP
/// on first use".
pub struct CachedSkillsetSource<S> {
    inner: S,
    cache: parking_lot::RwLock<HashMap<String, Arc<Skillset>>>,
}

impl<S: SkillsetSource> CachedSkillsetSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, cache: parking_lot::RwLock::new(HashMap::new()) }
    }

    pub async fn get(&self, path: &str) -> Result<Arc<Skillset>, RuntimeError> {
        if let Some(hit) = self.cache.read().get(path) {
            return Ok(hit.clone());
        }
        let skillset = Arc::new(self.inner.fetch_skillset(path).await?);
        self.cache.write().insert(path.to_string(), skillset.clone());
        Ok(skillset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tansive_catalog::{SkillDef, SkillSource};

    struct CountingSource {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SkillsetSource for CountingSource {
        async fn fetch_skillset(&self, path: &str) -> Result<Skillset, RuntimeError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Skillset {
                path: path.to_string(),
                sources: vec![SkillSource { runner_id: "system.stdiorunner".to_string(), config: serde_json::json!({}) }],
                skills: vec![SkillDef {
                    name: "run".to_string(),
                    description: String::new(),
                    source_ref: "system.stdiorunner".to_string(),
                    input_schema: serde_json::json!({"type": "object"}),
                    output_schema: serde_json::json!({"type": "object"}),
                    transform: None,
                    exported_actions: vec!["demo.run".to_string()],
                }],
                context: vec![],
                dependencies: vec![],
            })
        }
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let source = CachedSkillsetSource::new(CountingSource { calls: std::sync::atomic::AtomicUsize::new(0) });
        source.get("demo/agent").await.unwrap();
        source.get("demo/agent").await.unwrap();
        assert_eq!(source.inner.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
