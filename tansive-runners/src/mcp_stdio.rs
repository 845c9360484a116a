//! MCP-over-stdio runner: frames the argument bundle as a JSON-RPC `tools/call` request and
//! reads a single newline-delimited JSON-RPC response back.

use async_trait::async_trait;
use serde_json::json;
use tansive_core::RuntimeError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::process::Stdio;

use crate::{command_and_args, Runner, RunnerOutcome, RunnerRequest};

/// Speaks the MCP `tools/call` request/response shape over a child process's stdio, rather than
/// the plain bundle-in/JSON-out contract `StdioRunner` uses. This is a thin framing shim, not a
/// full MCP client — it issues exactly one call per invocation and exits.
pub struct McpStdioRunner;

impl McpStdioRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for McpStdioRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runner for McpStdioRunner {
    async fn invoke(&self, req: RunnerRequest) -> Result<RunnerOutcome, RuntimeError> {
        let (command, args) = command_and_args(&req.config)?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": req.invocation_id.to_string(),
            "method": "tools/call",
            "params": {
                "name": req.skill_name,
                "arguments": req.input_args,
            },
        });
        let mut line = serde_json::to_vec(&request).map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;
        line.push(b'\n');

        let mut child = Command::new(&command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed to spawn '{command}': {e}") })?;

        let mut stdin = child.stdin.take().expect("stdin piped at spawn");
        stdin
            .write_all(&line)
            .await
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed to write stdin: {e}") })?;
        drop(stdin);

        let stdout = child.stdout.take().expect("stdout piped at spawn");
        let mut reader = BufReader::new(stdout);
        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .await
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed to read response: {e}") })?;

        let status = child
            .wait()
            .await
            .map_err(|e| RuntimeError::RunnerError { summary: format!("failed waiting on '{command}': {e}") })?;

        let response: serde_json::Value = serde_json::from_str(response_line.trim())
            .map_err(|e| RuntimeError::RunnerError { summary: format!("malformed JSON-RPC response: {e}") })?;

        if let Some(error) = response.get("error") {
            return Err(RuntimeError::RunnerError { summary: format!("mcp tool call failed: {error}") });
        }

        Ok(RunnerOutcome {
            output: response.get("result").cloned().unwrap_or(serde_json::Value::Null),
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_an_error_response() {
        let runner = McpStdioRunner::new();
        // `cat` echoes our request line back, which has no "result"/"error" shape match for a
        // JSON-RPC error, so this exercises the error-object detection path with a crafted
        // responder instead of `cat`.
        let req = RunnerRequest {
            invocation_id: uuid::Uuid::new_v4(),
            service_endpoint: String::new(),
            run_mode: "session".to_string(),
            session_id: uuid::Uuid::new_v4(),
            skill_name: "list-pods".to_string(),
            input_args: json!({}),
            session_variables: json!({}),
            config: json!({"command": "sh", "args": ["-c", "read _; echo '{\"jsonrpc\":\"2.0\",\"id\":\"1\",\"error\":{\"code\":-1,\"message\":\"boom\"}}'"]}),
        };
        let err = runner.invoke(req).await.unwrap_err();
        assert!(matches!(err, RuntimeError::RunnerError { .. }));
    }

    #[tokio::test]
    async fn extracts_result_field() {
        let runner = McpStdioRunner::new();
        let req = RunnerRequest {
            invocation_id: uuid::Uuid::new_v4(),
            service_endpoint: String::new(),
            run_mode: "session".to_string(),
            session_id: uuid::Uuid::new_v4(),
            skill_name: "list-pods".to_string(),
            input_args: json!({}),
            session_variables: json!({}),
            config: json!({"command": "sh", "args": ["-c", "read _; echo '{\"jsonrpc\":\"2.0\",\"id\":\"1\",\"result\":{\"pods\":[]}}'"]}),
        };
        let outcome = runner.invoke(req).await.unwrap();
        assert_eq!(outcome.output, json!({"pods": []}));
    }
}
