//! Maps runner ids (as named in a skillset's `SkillSource.runner_id`) to the `Runner`
//! implementation that serves them.

use std::collections::HashMap;
use std::sync::Arc;
use tansive_core::RuntimeError;

use crate::{McpStdioRunner, Runner, RunnerOutcome, RunnerRequest, StdioRunner, MCP_STDIO_RUNNER_ID, STDIO_RUNNER_ID};

/// Registry of runner ids to their implementations. Construct with [`RunnerRegistry::default`]
/// for the two built-in runners, or [`RunnerRegistry::new`] to start empty and register
/// implementations explicitly (useful in tests).
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn Runner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self { runners: HashMap::new() }
    }

    pub fn register(&mut self, runner_id: impl Into<String>, runner: Arc<dyn Runner>) {
        self.runners.insert(runner_id.into(), runner);
    }

    /// Dispatch `req` to the runner named `runner_id`. Unknown ids fail with `InvalidRunner`
    /// per the skill invocation contract's runner-selection step.
    pub async fn invoke(&self, runner_id: &str, req: RunnerRequest) -> Result<RunnerOutcome, RuntimeError> {
        let runner = self
            .runners
            .get(runner_id)
            .ok_or_else(|| RuntimeError::InvalidRunner { runner_id: runner_id.to_string() })?;
        runner.invoke(req).await
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(STDIO_RUNNER_ID, Arc::new(StdioRunner::new()));
        registry.register(MCP_STDIO_RUNNER_ID, Arc::new(McpStdioRunner::new()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_runner_id_fails() {
        let registry = RunnerRegistry::default();
        let req = RunnerRequest {
            invocation_id: uuid::Uuid::new_v4(),
            service_endpoint: String::new(),
            run_mode: "session".to_string(),
            session_id: uuid::Uuid::new_v4(),
            skill_name: "x".to_string(),
            input_args: serde_json::json!({}),
            session_variables: serde_json::json!({}),
            config: serde_json::json!({}),
        };
        let err = registry.invoke("system.unknown", req).await.unwrap_err();
        assert_eq!(err, RuntimeError::InvalidRunner { runner_id: "system.unknown".to_string() });
    }

    #[tokio::test]
    async fn default_registry_dispatches_stdio_runner() {
        let registry = RunnerRegistry::default();
        let req = RunnerRequest {
            invocation_id: uuid::Uuid::new_v4(),
            service_endpoint: String::new(),
            run_mode: "session".to_string(),
            session_id: uuid::Uuid::new_v4(),
            skill_name: "echo".to_string(),
            input_args: serde_json::json!({}),
            session_variables: serde_json::json!({}),
            config: serde_json::json!({"command": "cat"}),
        };
        let outcome = registry.invoke(super::STDIO_RUNNER_ID, req).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
    }
}
