//! Per-session call graph: detects tool-call loops and enforces a maximum ancestry depth.
//!
//! Every skill/tool invocation registers itself as a child of its invoker. A new call is
//! rejected if any ancestor already carries the same tool name (a loop), or if admitting it would
//! push the ancestry chain past the configured maximum depth.

use parking_lot::RwLock;
use std::collections::HashMap;
use tansive_core::RuntimeError;
use uuid::Uuid;

/// Default maximum ancestry depth when a session does not configure one explicitly.
pub const DEFAULT_MAX_DEPTH: usize = 32;

struct State {
    parents: HashMap<Uuid, Option<Uuid>>,
    tools: HashMap<Uuid, String>,
}

/// In-memory, per-session call graph guarded by a single RW lock.
pub struct CallGraph {
    max_depth: usize,
    state: RwLock<State>,
}

impl CallGraph {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth, state: RwLock::new(State { parents: HashMap::new(), tools: HashMap::new() }) }
    }

    /// Register a new call `child` invoking `tool`, with invoker `parent` (`None` for a root
    /// call). Rejects the registration (without mutating state) if an ancestor already carries
    /// `tool`'s name, or if the resulting depth would exceed the configured maximum.
    pub fn register_call(&self, parent: Option<Uuid>, tool: &str, child: Uuid) -> Result<(), RuntimeError> {
        let mut state = self.state.write();

        let mut ancestry = Vec::new();
        let mut cursor = parent;
        while let Some(id) = cursor {
            ancestry.push(id);
            cursor = state.parents.get(&id).copied().flatten();
        }

        if ancestry.iter().any(|id| state.tools.get(id).map(|t| t.as_str()) == Some(tool)) {
            return Err(RuntimeError::LoopDetected { tool: tool.to_string() });
        }

        let new_depth = ancestry.len() + 1;
        if new_depth > self.max_depth {
            return Err(RuntimeError::DepthExceeded { limit: self.max_depth });
        }

        state.parents.insert(child, parent);
        state.tools.insert(child, tool.to_string());
        Ok(())
    }

    /// The tool name registered for `id`, or `None` if `id` is unknown.
    pub fn get_tool_name(&self, id: Uuid) -> Option<String> {
        self.state.read().tools.get(&id).cloned()
    }

    /// Number of ancestors of `id` (0 for a root call, `None` if `id` is unknown).
    pub fn depth_of(&self, id: Uuid) -> Option<usize> {
        let state = self.state.read();
        if !state.tools.contains_key(&id) {
            return None;
        }
        let mut depth = 0;
        let mut cursor = state.parents.get(&id).copied().flatten();
        while let Some(current) = cursor {
            depth += 1;
            cursor = state.parents.get(&current).copied().flatten();
        }
        Some(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_e_loop_then_depth_exceeded() {
        let graph = CallGraph::new(3);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();

        graph.register_call(None, "x", a).unwrap();
        graph.register_call(Some(a), "y", b).unwrap();
        graph.register_call(Some(b), "z", c).unwrap();

        let err = graph.register_call(Some(c), "x", d).unwrap_err();
        assert_eq!(err, RuntimeError::LoopDetected { tool: "x".to_string() });

        let err = graph.register_call(Some(c), "w", d).unwrap_err();
        assert_eq!(err, RuntimeError::DepthExceeded { limit: 3 });
    }

    #[test]
    fn independent_chains_do_not_collide() {
        let graph = CallGraph::new(10);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        graph.register_call(None, "x", a).unwrap();
        // same tool name, but not an ancestor of b (separate root) — not a loop.
        graph.register_call(None, "x", b).unwrap();
    }

    #[test]
    fn get_tool_name_returns_none_for_unknown_id() {
        let graph = CallGraph::new(10);
        assert_eq!(graph.get_tool_name(Uuid::new_v4()), None);
    }

    #[test]
    fn get_tool_name_returns_registered_name() {
        let graph = CallGraph::new(10);
        let a = Uuid::new_v4();
        graph.register_call(None, "kubernetes.pods.list", a).unwrap();
        assert_eq!(graph.get_tool_name(a), Some("kubernetes.pods.list".to_string()));
    }

    #[test]
    fn depth_of_root_call_is_zero() {
        let graph = CallGraph::new(10);
        let a = Uuid::new_v4();
        graph.register_call(None, "x", a).unwrap();
        assert_eq!(graph.depth_of(a), Some(0));
    }

    #[test]
    fn rejected_registration_does_not_mutate_state() {
        let graph = CallGraph::new(1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        graph.register_call(None, "x", a).unwrap();
        assert!(graph.register_call(Some(a), "y", b).is_err());
        assert_eq!(graph.get_tool_name(b), None);
    }
}
