//! In-memory registry of active sessions this tangent is running.
//!
//! Each session's state is owned here; sub-tool requests from the skill process arrive on the
//! local socket and look up the session by ID in `dashmap`, already the concurrency-helper of
//! choice elsewhere in the workspace (`tansive-tokens::SigningKeyCache`, `InMemoryCatalog`).

use std::sync::Arc;
use uuid::Uuid;

use dashmap::DashMap;
use tansive_runtime::{HttpSkillsetSource, SessionRuntime};

/// One running session's runtime plus the bookkeeping needed to report it back to CS.
pub struct TangentSession {
    pub session_id: Uuid,
    pub mcp_key: String,
    pub runtime: SessionRuntime<HttpSkillsetSource>,
}

/// Maps both the session id (used by the local skill socket) and the MCP bridge's SHA-256 bearer
/// digest (used by `POST /session/mcp`) to the same running session.
#[derive(Default)]
pub struct SessionRegistry {
    by_session_id: DashMap<Uuid, Arc<TangentSession>>,
    by_mcp_key: DashMap<String, Uuid>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: TangentSession) -> Arc<TangentSession> {
        let session = Arc::new(session);
        self.by_mcp_key.insert(session.mcp_key.clone(), session.session_id);
        self.by_session_id.insert(session.session_id, session.clone());
        session
    }

    pub fn get_by_session_id(&self, session_id: Uuid) -> Option<Arc<TangentSession>> {
        self.by_session_id.get(&session_id).map(|entry| entry.clone())
    }

    pub fn get_by_mcp_key(&self, mcp_key: &str) -> Option<Arc<TangentSession>> {
        let session_id = *self.by_mcp_key.get(mcp_key)?;
        self.get_by_session_id(session_id)
    }

    /// Drop a finalized session from both indices; returns it so the caller can still use it
    /// (e.g. to read the audit log before it is dropped).
    pub fn remove(&self, session_id: Uuid) -> Option<Arc<TangentSession>> {
        let (_, session) = self.by_session_id.remove(&session_id)?;
        self.by_mcp_key.remove(&session.mcp_key);
        Some(session)
    }
}
