//! Local Unix socket endpoint for skill↔runtime sub-tool invocations.
//!
//! Newline-delimited JSON over a `0600` socket in a `0700` parent directory, one task per
//! accepted connection.

#[cfg(not(unix))]
compile_error!("the tangent's skill socket requires Unix domain sockets");

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use uuid::Uuid;

use crate::sessions::SessionRegistry;

/// One line of input on the socket: a sub-tool call a running skill process is making back into
/// the tangent.
#[derive(Deserialize)]
struct SkillInvocationRequest {
    session_id: Uuid,
    #[serde(default)]
    invocation_id: Option<Uuid>,
    skill_name: String,
    #[serde(default)]
    input_args: serde_json::Value,
}

#[derive(Serialize)]
struct SkillInvocationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    invocation_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn bind_listener(socket_path: &Path) -> std::io::Result<UnixListener> {
    if let Some(parent) = socket_path.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
            set_permissions(parent, 0o700).await?;
        }
    }
    if socket_path.exists() {
        tokio::fs::remove_file(socket_path).await?;
    }
    let listener = UnixListener::bind(socket_path)?;
    set_permissions(socket_path, 0o600).await?;
    Ok(listener)
}

async fn set_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

/// Accept connections forever, handling each on its own task. Every line is one request/response
/// pair; the connection stays open for as many invocations as the skill process wants to make.
pub async fn serve(listener: UnixListener, sessions: Arc<SessionRegistry>) {
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(%err, "failed to accept skill socket connection");
                continue;
            }
        };
        let sessions = sessions.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, sessions).await {
                tracing::warn!(%err, "skill socket connection ended with an error");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, sessions: Arc<SessionRegistry>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Ok(());
        }

        let response = handle_line(line.trim(), &sessions).await;
        let mut serialized = serde_json::to_vec(&response).unwrap_or_default();
        serialized.push(b'\n');
        write_half.write_all(&serialized).await?;
    }
}

async fn handle_line(line: &str, sessions: &SessionRegistry) -> SkillInvocationResponse {
    let request: SkillInvocationRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(err) => return SkillInvocationResponse { invocation_id: None, output: None, exit_code: None, error: Some(err.to_string()) },
    };

    let Some(session) = sessions.get_by_session_id(request.session_id) else {
        return SkillInvocationResponse {
            invocation_id: None,
            output: None,
            exit_code: None,
            error: Some(format!("no running session '{}'", request.session_id)),
        };
    };

    match session.runtime.run(request.invocation_id, &request.skill_name, request.input_args).await {
        Ok((invocation_id, outcome)) => SkillInvocationResponse {
            invocation_id: Some(invocation_id),
            output: Some(outcome.output),
            exit_code: Some(outcome.exit_code),
            error: None,
        },
        Err(err) => SkillInvocationResponse { invocation_id: None, output: None, exit_code: None, error: Some(err.to_string()) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_listener_sets_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("tangent.sock");
        let _listener = bind_listener(&socket_path).await.unwrap();

        let mode = std::fs::metadata(&socket_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn unknown_session_id_is_reported_as_an_error_line() {
        let sessions = SessionRegistry::new();
        let response = handle_line(&serde_json::to_string(&serde_json::json!({
            "session_id": Uuid::new_v4(),
            "skill_name": "run",
            "input_args": {},
        })).unwrap(), &sessions).await;
        assert!(response.error.is_some());
    }
}
