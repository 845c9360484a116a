//! Thin HTTP client over the Catalog Server surface the CLI drives, grounded on
//! `tansive-tangent::client::CatalogServerClient`'s shape: a base URL, a `reqwest::Client`, and
//! one method per endpoint that maps a non-2xx response to a structured `CliError::Api`.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{CliError, CliResult};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> CliResult<T> {
        let response = self.bearer(builder).send().await?;
        let url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("request failed")
                .to_string();
            return Err(CliError::Api { url, status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }

    async fn send_empty(&self, builder: reqwest::RequestBuilder) -> CliResult<()> {
        let response = self.bearer(builder).send().await?;
        let url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body.get("error").and_then(|e| e.get("message")).and_then(|m| m.as_str()).unwrap_or("request failed").to_string();
            return Err(CliError::Api { url, status: status.as_u16(), message });
        }
        Ok(())
    }

    fn bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn login(&self) -> CliResult<Value> {
        self.send(self.http.post(self.url("/auth/login"))).await
    }

    pub async fn adopt_default_view(&self, catalog: &str) -> CliResult<Value> {
        self.send(self.http.post(self.url(&format!("/auth/default-view-adoptions/{catalog}")))).await
    }

    pub async fn adopt_labeled_view(&self, catalog: &str, label: &str) -> CliResult<Value> {
        self.send(self.http.post(self.url(&format!("/auth/view-adoptions/{catalog}/{label}")))).await
    }

    pub async fn status(&self) -> CliResult<Value> {
        self.send(self.http.get(self.url("/status"))).await
    }

    pub async fn create(&self, kind: &str, scope: &[(&str, &str)], body: &Value) -> CliResult<Value> {
        self.send(self.http.post(self.url(&format!("/{kind}"))).query(scope).json(body)).await
    }

    pub async fn get(&self, kind: &str, name: &str, scope: &[(&str, &str)]) -> CliResult<Value> {
        self.send(self.http.get(self.url(&format!("/{kind}/{name}"))).query(scope)).await
    }

    pub async fn put(&self, kind: &str, name: &str, scope: &[(&str, &str)], body: &Value) -> CliResult<Value> {
        self.send(self.http.put(self.url(&format!("/{kind}/{name}"))).query(scope).json(body)).await
    }

    pub async fn delete(&self, kind: &str, name: &str, scope: &[(&str, &str)]) -> CliResult<()> {
        self.send_empty(self.http.delete(self.url(&format!("/{kind}/{name}"))).query(scope)).await
    }

    pub async fn list(&self, kind: &str, scope: &[(&str, &str)]) -> CliResult<Value> {
        self.send(self.http.get(self.url(&format!("/{kind}"))).query(scope)).await
    }

    pub async fn create_session(&self, body: &impl Serialize) -> CliResult<Value> {
        self.send(self.http.post(self.url("/sessions")).json(body)).await
    }
}
