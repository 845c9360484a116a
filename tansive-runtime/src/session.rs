//! Per-session runtime: the tangent-side half of the skill invocation contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use parking_lot::RwLock;
use serde_json::{json, Value};
use uuid::Uuid;

use tansive_callgraph::CallGraph;
use tansive_core::{ActionToken, ResourcePath, RuntimeError};
use tansive_eventbus::EventBus;
use tansive_hashlog::HashlogWriter;
use tansive_policy::{PolicyEngine, ViewDef};
use tansive_runners::{RunnerOutcome, RunnerRegistry, RunnerRequest};

use crate::js_transform::JsTransform;
use crate::skillset_source::{CachedSkillsetSource, SkillsetSource};

/// Grace window the runtime allows writers to drain after a cancellation before collapsing.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Timeout the runtime waits for log-writer finalization before proceeding with an empty log.
pub const FINALIZATION_TIMEOUT: Duration = Duration::from_secs(10);

/// The per-invocation topic an event is published to: `session.<id>.<eventType>`.
fn topic(session_id: Uuid, event_type: &str) -> String {
    format!("session.{session_id}.{event_type}")
}

/// Tangent-side runtime for a single session: caches the skillset, enforces policy per
/// invocation, runs the optional JS transform, dispatches to runners, tracks the call graph, and
/// audits every step through a hash-chained log.
pub struct SessionRuntime<S> {
    session_id: Uuid,
    skillset_path: String,
    root_view: ViewDef,
    service_endpoint: String,
    run_mode: String,
    session_variables: Value,
    call_graph: CallGraph,
    invocation_views: RwLock<HashMap<Uuid, ViewDef>>,
    event_bus: Arc<EventBus>,
    audit: Arc<HashlogWriter>,
    policy: PolicyEngine,
    skillsets: CachedSkillsetSource<S>,
    runners: RunnerRegistry,
    js: Arc<dyn JsTransform>,
}

impl<S: SkillsetSource> SessionRuntime<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: Uuid,
        skillset_path: String,
        root_view: ViewDef,
        service_endpoint: String,
        run_mode: String,
        session_variables: Value,
        max_call_depth: usize,
        event_bus: Arc<EventBus>,
        audit: Arc<HashlogWriter>,
        skillsets: S,
        runners: RunnerRegistry,
        js: Arc<dyn JsTransform>,
    ) -> Self {
        Self {
            session_id,
            skillset_path,
            root_view,
            service_endpoint,
            run_mode,
            session_variables,
            call_graph: CallGraph::new(max_call_depth),
            invocation_views: RwLock::new(HashMap::new()),
            event_bus,
            audit,
            policy: PolicyEngine::new(),
            skillsets: CachedSkillsetSource::new(skillsets),
            runners,
            js,
        }
    }

    async fn publish(&self, event_type: &str, data: Value) {
        self.event_bus.publish(&topic(self.session_id, event_type), data, Duration::from_millis(500)).await;
    }

    fn audit(&self, payload: Value) {
        if let Err(err) = self.audit.add_entry(payload) {
            tracing::error!(?err, session_id = %self.session_id, "failed to append audit entry");
        }
    }

    /// Run a skill invocation. `invoker_id` is `None` for the session's root call, or `Some` of
    /// a previously-registered `invocationID` for a sub-tool call arriving from a running skill
    /// process. Returns the runner's outcome and the freshly minted `invocationID`.
    pub async fn run(&self, invoker_id: Option<Uuid>, skill_name: &str, input_args: Value) -> Result<(Uuid, RunnerOutcome), RuntimeError> {
        // Step 1: resolve the authorizing view for this call.
        let view = match invoker_id {
            None => self.root_view.clone(),
            Some(id) => self
                .invocation_views
                .read()
                .get(&id)
                .cloned()
                .ok_or(RuntimeError::InvalidInvocationId { id: id.to_string() })?,
        };

        // Step 2: resolve skillset and skill.
        let skillset = self.skillsets.get(&self.skillset_path).await?;
        let skill = skillset
            .find_skill(skill_name)
            .ok_or_else(|| RuntimeError::SkillNotFound { name: skill_name.to_string(), skillset: self.skillset_path.clone() })?
            .clone();

        // Step 3: policy check.
        let resource = ResourcePath::parse(&format!("res://skillsets/{}", self.skillset_path))
            .map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;
        let actions: Vec<ActionToken> = skill.exported_actions.iter().map(|a| a.as_str().into()).collect();
        let decision = self.policy.evaluate(&view, &resource, &actions);
        self.audit(json!({
            "event": "policy_decision",
            "skill": skill_name,
            "allowed": decision.allowed,
            "actions": actions.iter().map(ActionToken::as_str).collect::<Vec<_>>(),
        }));
        self.publish("audit", json!({"event": "policy_decision", "skill": skill_name, "allowed": decision.allowed})).await;
        if !decision.allowed {
            return Err(RuntimeError::BlockedByPolicy { reason: format!("skill '{skill_name}' was denied by the current view") });
        }

        // Step 4: optional JS transform.
        let mut input_args = input_args;
        if let Some(source) = &skill.transform {
            match self.js.transform(source, &self.session_variables, &input_args).await {
                Ok(transformed) => {
                    self.audit(json!({"event": "transform", "skill": skill_name, "ok": true}));
                    input_args = transformed;
                }
                Err(err) => {
                    self.audit(json!({"event": "transform", "skill": skill_name, "ok": false, "error": err.to_string()}));
                    return Err(err);
                }
            }
        }

        // Step 5: input validation against the skill's declared JSON schema.
        let validator = jsonschema::validator_for(&skill.input_schema)
            .map_err(|e| RuntimeError::ValidationError { reason: e.to_string() })?;
        if !validator.is_valid(&input_args) {
            return Err(RuntimeError::ValidationError { reason: format!("input does not satisfy '{skill_name}' input schema") });
        }

        // Step 6: runner selection.
        let source = skillset
            .find_source(&skill.source_ref)
            .ok_or_else(|| RuntimeError::InvalidRunner { runner_id: skill.source_ref.clone() })?;

        // Step 7: call graph registration.
        let invocation_id = Uuid::new_v4();
        self.call_graph.register_call(invoker_id, skill_name, invocation_id)?;
        self.invocation_views.write().insert(invocation_id, view);

        // Step 8/9: execute with a grace window on cancellation.
        let request = RunnerRequest {
            invocation_id,
            service_endpoint: self.service_endpoint.clone(),
            run_mode: self.run_mode.clone(),
            session_id: self.session_id,
            skill_name: skill_name.to_string(),
            input_args,
            session_variables: self.session_variables.clone(),
            config: source.config.clone(),
        };
        let outcome = self.runners.invoke(&skill.source_ref, request).await;

        // Step 10: audit completion.
        match &outcome {
            Ok(o) => self.audit(json!({"event": "invocation_complete", "invocationID": invocation_id, "exitCode": o.exit_code})),
            Err(e) => self.audit(json!({"event": "invocation_failed", "invocationID": invocation_id, "error": e.to_string()})),
        }
        self.publish("invocation", json!({"invocationID": invocation_id, "skill": skill_name})).await;

        outcome.map(|o| (invocation_id, o))
    }

    /// Finalize the session: flush and close the audit writer, returning the snappy-compressed,
    /// base64-encoded log and the Ed25519 verification key the server should persist.
    pub fn finalize(&self) -> Result<(String, [u8; 32]), RuntimeError> {
        self.audit.flush().map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;
        self.audit.close().map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;

        let raw = std::fs::read(self.audit.path()).map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;
        let compressed = snap::raw::Encoder::new()
            .compress_vec(&raw)
            .map_err(|e| RuntimeError::RunnerError { summary: e.to_string() })?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);

        self.event_bus.close_all_for_pattern(&format!("session.{}.*", self.session_id));

        Ok((encoded, self.audit.verification_public_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js_transform::JsTransform;
    use async_trait::async_trait;
    use tansive_catalog::{SkillDef, SkillSource, Skillset};
    use tansive_core::{CatalogId, EntityIdType, Scope};

    struct FixtureSource(Skillset);

    #[async_trait]
    impl SkillsetSource for FixtureSource {
        async fn fetch_skillset(&self, _path: &str) -> Result<Skillset, RuntimeError> {
            Ok(self.0.clone())
        }
    }

    struct NoopTransform;

    #[async_trait]
    impl JsTransform for NoopTransform {
        async fn transform(&self, _source: &str, _session_variables: &Value, input_args: &Value) -> Result<Value, RuntimeError> {
            Ok(input_args.clone())
        }
    }

    fn skillset() -> Skillset {
        Skillset {
            path: "demo/agent".to_string(),
            sources: vec![SkillSource { runner_id: "system.stdiorunner".to_string(), config: json!({"command": "cat"}) }],
            skills: vec![SkillDef {
                name: "list-pods".to_string(),
                description: String::new(),
                source_ref: "system.stdiorunner".to_string(),
                input_schema: json!({"type": "object"}),
                output_schema: json!({"type": "object"}),
                transform: None,
                exported_actions: vec!["kubernetes.pods.list".to_string()],
            }],
            context: vec![],
            dependencies: vec![],
        }
    }

    fn allow_all_view() -> ViewDef {
        use tansive_policy::{Intent, Rule};
        ViewDef::new(
            "admin",
            Scope::catalog_only(CatalogId::nil(), "c"),
            vec![Rule::new(
                Intent::Allow,
                vec!["kubernetes.pods.list".into()],
                vec![ResourcePath::parse("res://skillsets/demo/agent").unwrap()],
            )],
        )
    }

    fn empty_view() -> ViewDef {
        ViewDef::new("powerless", Scope::catalog_only(CatalogId::nil(), "c"), vec![])
    }

    fn runtime(dir: &tempfile::TempDir, view: ViewDef) -> SessionRuntime<FixtureSource> {
        let key = {
            use rand::RngCore;
            let mut k = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut k);
            k
        };
        let audit = Arc::new(HashlogWriter::create(dir.path().join("log.jsonl"), &key, 1).unwrap());
        SessionRuntime::new(
            Uuid::new_v4(),
            "demo/agent".to_string(),
            view,
            "unix:///tmp/tangent.sock".to_string(),
            "session".to_string(),
            json!({}),
            32,
            Arc::new(EventBus::new()),
            audit,
            FixtureSource(skillset()),
            RunnerRegistry::default(),
            Arc::new(NoopTransform),
        )
    }

    #[tokio::test]
    async fn allowed_skill_runs_and_registers_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(&dir, allow_all_view());
        let (invocation_id, outcome) = runtime.run(None, "list-pods", json!({})).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(runtime.invocation_views.read().contains_key(&invocation_id));
    }

    #[tokio::test]
    async fn denied_skill_is_blocked_by_policy() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(&dir, empty_view());
        let err = runtime.run(None, "list-pods", json!({})).await.unwrap_err();
        assert!(matches!(err, RuntimeError::BlockedByPolicy { .. }));
    }

    #[tokio::test]
    async fn unknown_invoker_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(&dir, allow_all_view());
        let err = runtime.run(Some(Uuid::new_v4()), "list-pods", json!({})).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidInvocationId { .. }));
    }

    #[tokio::test]
    async fn unknown_skill_fails_with_skill_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(&dir, allow_all_view());
        let err = runtime.run(None, "missing", json!({})).await.unwrap_err();
        assert!(matches!(err, RuntimeError::SkillNotFound { .. }));
    }

    #[tokio::test]
    async fn finalize_produces_a_compressed_log_and_verification_key() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(&dir, allow_all_view());
        runtime.run(None, "list-pods", json!({})).await.unwrap();
        let (encoded, key) = runtime.finalize().unwrap();
        assert!(!encoded.is_empty());
        assert_eq!(key.len(), 32);
    }
}
