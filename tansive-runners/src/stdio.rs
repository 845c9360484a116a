//! Plain stdio runner: spawns a child process, writes the argument bundle as one line of JSON
//! on stdin, then reads the whole of stdout once the process exits.

use async_trait::async_trait;
use tansive_core::RuntimeError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::process::Stdio;

use crate::{command_and_args, Runner, RunnerOutcome, RunnerRequest};

/// Invokes a runner binary by feeding it the request bundle on stdin and parsing whatever JSON
/// it writes to stdout. A non-JSON stdout is wrapped as `{"raw": "<trimmed stdout>"}` rather than
/// treated as an error — not every stdio tool speaks structured output.
pub struct StdioRunner;

impl StdioRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdioRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runner for StdioRunner {
    async fn invoke(&self, req: RunnerRequest) -> Result<RunnerOutcome, RuntimeError> {
        let (command, args) = command_and_args(&req.config)?;
        let payload = serde_json::to_vec(&req).map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;

        let mut child = Command::new(&command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed to spawn '{command}': {e}") })?;

        let mut stdin = child.stdin.take().expect("stdin piped at spawn");
        stdin
            .write_all(&payload)
            .await
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed to write stdin: {e}") })?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed waiting on '{command}': {e}") })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = serde_json::from_str(stdout.trim())
            .unwrap_or_else(|_| serde_json::json!({"raw": stdout.trim()}));

        Ok(RunnerOutcome {
            output: value,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_structured_json_from_cat() {
        let runner = StdioRunner::new();
        let req = RunnerRequest {
            invocation_id: uuid::Uuid::new_v4(),
            service_endpoint: "unix:///tmp/tangent.sock".to_string(),
            run_mode: "session".to_string(),
            session_id: uuid::Uuid::new_v4(),
            skill_name: "echo".to_string(),
            input_args: serde_json::json!({"a": 1}),
            session_variables: serde_json::json!({}),
            config: serde_json::json!({"command": "cat"}),
        };
        let outcome = runner.invoke(req).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.output["skillName"], "echo");
    }

    #[tokio::test]
    async fn missing_command_is_a_runner_error() {
        let runner = StdioRunner::new();
        let req = RunnerRequest {
            invocation_id: uuid::Uuid::new_v4(),
            service_endpoint: String::new(),
            run_mode: "session".to_string(),
            session_id: uuid::Uuid::new_v4(),
            skill_name: "echo".to_string(),
            input_args: serde_json::json!({}),
            session_variables: serde_json::json!({}),
            config: serde_json::json!({}),
        };
        assert!(runner.invoke(req).await.is_err());
    }
}
