//! Runner dispatch: invokes a skill's underlying process given the runner id named in its
//! `SkillSource` and the structured argument bundle the session runtime builds for it.
//!
//! Concrete runner binaries are a collaborator, not this crate's concern — `StdioRunner` and
//! `McpStdioRunner` only define the process-mechanics shim (spawn, feed the arg bundle on stdin,
//! read a result back) that any binary conforming to either protocol can sit behind.

mod mcp_stdio;
mod registry;
mod stdio;

pub use mcp_stdio::McpStdioRunner;
pub use registry::RunnerRegistry;
pub use stdio::StdioRunner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tansive_core::RuntimeError;
use uuid::Uuid;

/// Well-known runner id for a plain stdio process.
pub const STDIO_RUNNER_ID: &str = "system.stdiorunner";

/// Well-known runner id for an MCP server spoken over stdio (JSON-RPC framed, newline-delimited).
pub const MCP_STDIO_RUNNER_ID: &str = "system.mcpstdiorunner";

/// The structured argument bundle handed to a runner on every invocation (spec step 8 of the
/// skill invocation contract): everything the child process needs to identify the call, reach
/// back into the tangent for sub-tool calls, and receive its validated input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerRequest {
    pub invocation_id: Uuid,
    pub service_endpoint: String,
    pub run_mode: String,
    pub session_id: Uuid,
    pub skill_name: String,
    pub input_args: serde_json::Value,
    pub session_variables: serde_json::Value,
    /// The matching `SkillSource.config` blob — runner-specific (command, args, env, ...); not
    /// part of the wire bundle itself, so it is skipped on serialization.
    #[serde(skip)]
    pub config: serde_json::Value,
}

/// What a runner invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerOutcome {
    pub output: serde_json::Value,
    pub exit_code: i32,
}

/// A runner knows how to turn a [`RunnerRequest`] into a [`RunnerOutcome`]. Implementations
/// shell out to a child process; the trait exists so the session runtime never has to know which
/// protocol a given runner id speaks.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn invoke(&self, req: RunnerRequest) -> Result<RunnerOutcome, RuntimeError>;
}

/// Extract `command` (required) and `args` (optional, default empty) out of a runner config
/// blob. Shared by both stdio-flavored runners since they spawn a process the same way and only
/// differ in how they frame the request/response on the pipe.
fn command_and_args(config: &serde_json::Value) -> Result<(String, Vec<String>), RuntimeError> {
    let command = config
        .get("command")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RuntimeError::RunnerError { summary: "runner config missing 'command'".to_string() })?
        .to_string();

    let args = config
        .get("args")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    Ok((command, args))
}
