//! Input-transform sandboxing.
//!
//! No embeddable JS engine appears anywhere in the reference corpus this crate is grounded on.
//! `NodeJsTransform` implements the documented fallback instead: a subprocess running a small
//! embedded Node snippet, fed `(sessionVariables, inputArgs)` as JSON on stdin, bounded by a hard
//! wall-clock timeout. The `JsTransform` trait exists so a future embeddable evaluator can be
//! swapped in without touching callers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tansive_core::RuntimeError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::process::Stdio;

/// Hard wall-clock budget for a transform, per the skill invocation contract's step 4.
pub const JS_TRANSFORM_BUDGET_MS: u64 = 25;

const NODE_SNIPPET: &str = r#"const fs=require('fs');const input=JSON.parse(fs.readFileSync(0,'utf8'));const fn=new Function('sessionVariables','inputArgs',input.source);const result=fn(input.sessionVariables,input.inputArgs);process.stdout.write(JSON.stringify(result===undefined?null:result));"#;

#[async_trait]
pub trait JsTransform: Send + Sync {
    /// Evaluate `source` as the body of `function(sessionVariables, inputArgs) { ... }` and
    /// return whatever it returns (or throws, surfaced as `JsExecutionError`).
    async fn transform(&self, source: &str, session_variables: &Value, input_args: &Value) -> Result<Value, RuntimeError>;
}

/// Runs the transform body inside a `node -e` child process bounded by [`JS_TRANSFORM_BUDGET_MS`].
pub struct NodeJsTransform {
    budget: Duration,
}

impl NodeJsTransform {
    pub fn new() -> Self {
        Self { budget: Duration::from_millis(JS_TRANSFORM_BUDGET_MS) }
    }
}

impl Default for NodeJsTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JsTransform for NodeJsTransform {
    async fn transform(&self, source: &str, session_variables: &Value, input_args: &Value) -> Result<Value, RuntimeError> {
        let payload = json!({
            "source": source,
            "sessionVariables": session_variables,
            "inputArgs": input_args,
        });
        let bytes = serde_json::to_vec(&payload).map_err(|e| RuntimeError::JsExecutionError { reason: e.to_string() })?;

        let mut child = Command::new("node")
            .arg("-e")
            .arg(NODE_SNIPPET)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::JsExecutionError { reason: format!("failed to spawn node: {e}") })?;

        let mut stdin = child.stdin.take().expect("stdin piped at spawn");

        let run = async {
            stdin.write_all(&bytes).await.map_err(|e| RuntimeError::JsExecutionError { reason: e.to_string() })?;
            drop(stdin);
            child
                .wait_with_output()
                .await
                .map_err(|e| RuntimeError::JsExecutionError { reason: e.to_string() })
        };

        let output = match tokio::time::timeout(self.budget, run).await {
            Ok(result) => result?,
            Err(_) => return Err(RuntimeError::JsRuntimeTimeout { budget_ms: self.budget.as_millis() as u64 }),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RuntimeError::JsExecutionError { reason: stderr });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| RuntimeError::JsExecutionError { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a `node` binary on PATH; exercised manually rather than in the default test run.
    #[tokio::test]
    #[ignore = "requires node on PATH"]
    async fn transforms_input_args() {
        let transform = NodeJsTransform::new();
        let result = transform
            .transform("return {out: inputArgs.a + 1};", &json!({}), &json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(result, json!({"out": 2}));
    }

    #[tokio::test]
    #[ignore = "requires node on PATH"]
    async fn exceeding_budget_times_out() {
        let transform = NodeJsTransform::new();
        let err = transform.transform("while (true) {}", &json!({}), &json!({})).await.unwrap_err();
        assert_eq!(err, RuntimeError::JsRuntimeTimeout { budget_ms: JS_TRANSFORM_BUDGET_MS });
    }
}
