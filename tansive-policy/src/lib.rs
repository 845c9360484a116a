//! Policy engine: rule evaluation, target matching, and the admin-match shortcut.
//!
//! The engine is stateless and pure over its inputs — a `PolicyEngine` value carries no data and
//! every method takes the view definition and request explicitly, so it is trivially safe to call
//! concurrently from both the catalog server (view adoption scoping) and the tangent (per-skill
//! policy checks) without any shared mutable state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tansive_core::{ActionToken, ResourceKind, ResourcePath, Scope};

pub use tansive_core::resource::ResourceKind as Kind;

/// Whether a rule allows or denies the actions/targets it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Allow,
    Deny,
}

/// A single authorization rule: an intent over a set of actions and a set of target patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub intent: Intent,
    pub actions: Vec<ActionToken>,
    pub targets: Vec<ResourcePath>,
}

impl Rule {
    pub fn new(intent: Intent, actions: Vec<ActionToken>, targets: Vec<ResourcePath>) -> Self {
        Self {
            intent,
            actions,
            targets,
        }
    }

    fn matches_target(&self, resource: &ResourcePath) -> bool {
        self.targets.iter().any(|t| t.matches(resource))
    }

    fn covers_action(&self, action: &ActionToken) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}

/// A view: a label, the catalog it belongs to, its implicit scope, and its rule set — the sole
/// authorization artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDef {
    pub label: String,
    pub scope: Scope,
    pub rules: Vec<Rule>,
}

impl ViewDef {
    pub fn new(label: impl Into<String>, scope: Scope, rules: Vec<Rule>) -> Self {
        Self {
            label: label.into(),
            scope,
            rules,
        }
    }
}

/// The rules that justified a decision, grouped by the intent they carried.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Basis {
    pub allow: Vec<Rule>,
    pub deny: Vec<Rule>,
}

impl Basis {
    fn push(&mut self, rule: &Rule) {
        match rule.intent {
            Intent::Allow => {
                if !self.allow.contains(rule) {
                    self.allow.push(rule.clone());
                }
            }
            Intent::Deny => {
                if !self.deny.contains(rule) {
                    self.deny.push(rule.clone());
                }
            }
        }
    }
}

/// The outcome of evaluating a set of actions against a view for a resource.
#[derive(Debug, Clone)]
pub struct Decision {
    pub allowed: bool,
    pub per_action: HashMap<ActionToken, bool>,
    pub basis: Basis,
}

/// Stateless policy evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `actions` against `resource` under view `view`.
    ///
    /// Empty `actions` trivially allows with an empty basis; callers must ensure `actions` is
    /// non-empty for a real authorization check.
    pub fn evaluate(&self, view: &ViewDef, resource: &ResourcePath, actions: &[ActionToken]) -> Decision {
        let mut basis = Basis::default();

        if actions.is_empty() {
            return Decision {
                allowed: true,
                per_action: HashMap::new(),
                basis,
            };
        }

        // Step 1: admin shortcut.
        let mut admin_allowed = false;
        let admin_bearing = resource
            .kind()
            .map(ResourceKind::is_admin_bearing)
            .unwrap_or(false);
        if admin_bearing {
            for rule in &view.rules {
                if rule.intent != Intent::Allow {
                    continue;
                }
                let has_admin_action = rule.actions.iter().any(|a| a.is_admin_action());
                if has_admin_action && rule.matches_target(resource) {
                    admin_allowed = true;
                    basis.push(rule);
                }
            }
        }

        // Step 2: explicit per-action evaluation (deny wins).
        let mut per_action = HashMap::new();
        for action in actions {
            let matching: Vec<&Rule> = view
                .rules
                .iter()
                .filter(|r| r.matches_target(resource) && r.covers_action(action))
                .collect();

            let any_deny = matching.iter().any(|r| r.intent == Intent::Deny);
            let any_allow = matching.iter().any(|r| r.intent == Intent::Allow);

            let explicit_allowed = if any_deny {
                for r in matching.iter().filter(|r| r.intent == Intent::Deny) {
                    basis.push(r);
                }
                false
            } else if any_allow {
                for r in matching.iter().filter(|r| r.intent == Intent::Allow) {
                    basis.push(r);
                }
                true
            } else {
                false
            };

            per_action.insert(action.clone(), explicit_allowed || admin_allowed);
        }

        let allowed = per_action.values().all(|v| *v);

        Decision {
            allowed,
            per_action,
            basis,
        }
    }

    /// Convenience for a single-action check.
    pub fn is_allowed(&self, view: &ViewDef, resource: &ResourcePath, action: &ActionToken) -> bool {
        self.evaluate(view, resource, std::slice::from_ref(action)).allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tansive_core::EntityIdType;

    fn scope() -> Scope {
        Scope::catalog_only(tansive_core::CatalogId::nil(), "valid-catalog")
    }

    fn rule(intent: Intent, actions: &[&str], targets: &[&str]) -> Rule {
        Rule::new(
            intent,
            actions.iter().map(|a| ActionToken::new(*a)).collect(),
            targets
                .iter()
                .map(|t| ResourcePath::parse(t).unwrap())
                .collect(),
        )
    }

    #[test]
    fn deny_beats_allow_on_same_action() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![
                rule(Intent::Allow, &["system.catalog.read"], &["res://catalogs/x"]),
                rule(Intent::Deny, &["system.catalog.read"], &["res://catalogs/x"]),
            ],
        );
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[ActionToken::new("system.catalog.read")],
        );
        assert!(!decision.allowed);
        assert!(!decision.basis.deny.is_empty());
    }

    #[test]
    fn admin_shortcut_implies_all_requested_actions() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![rule(
                Intent::Allow,
                &["system.catalog.admin"],
                &["res://catalogs/x"],
            )],
        );
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[
                ActionToken::new("system.catalog.read"),
                ActionToken::new("system.catalog.write"),
            ],
        );
        assert!(decision.allowed);
    }

    #[test]
    fn admin_shortcut_never_applies_to_reserved_kinds() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![rule(
                Intent::Allow,
                &["system.catalog.admin"],
                &["res://resources/x", "res://views/x"],
            )],
        );
        for path in ["res://resources/x", "res://views/x"] {
            let resource = ResourcePath::parse(path).unwrap();
            let decision = PolicyEngine::new().evaluate(
                &view,
                &resource,
                &[ActionToken::new("system.catalog.read")],
            );
            assert!(!decision.allowed, "{path} must not be admin-matchable");
        }
    }

    #[test]
    fn skillsets_are_not_admin_bearing() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![rule(
                Intent::Allow,
                &["system.skillset.admin"],
                &["res://skillsets/demo/agent"],
            )],
        );
        let resource = ResourcePath::parse("res://skillsets/demo/agent").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[ActionToken::new("kubernetes.pods.list")],
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn deny_with_admin_action_does_not_block_unrelated_actions() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![
                rule(Intent::Deny, &["system.catalog.admin"], &["res://catalogs/x"]),
                rule(
                    Intent::Allow,
                    &["system.catalog.read"],
                    &["res://catalogs/x"],
                ),
            ],
        );
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[ActionToken::new("system.catalog.read")],
        );
        assert!(decision.allowed);
    }

    #[test]
    fn empty_actions_are_trivially_allowed() {
        let view = ViewDef::new("v", scope(), vec![]);
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        let decision = PolicyEngine::new().evaluate(&view, &resource, &[]);
        assert!(decision.allowed);
        assert!(decision.basis.allow.is_empty() && decision.basis.deny.is_empty());
    }

    #[test]
    fn rule_with_no_targets_matches_nothing() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![Rule::new(
                Intent::Allow,
                vec![ActionToken::new("system.catalog.read")],
                vec![],
            )],
        );
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[ActionToken::new("system.catalog.read")],
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn default_deny_when_no_rule_matches() {
        let view = ViewDef::new("v", scope(), vec![]);
        let resource = ResourcePath::parse("res://skillsets/demo/agent").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[ActionToken::new("kubernetes.pods.list")],
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn scenario_b_skill_run_then_blocked_after_retarget() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![rule(
                Intent::Allow,
                &["kubernetes.pods.list"],
                &["res://skillsets/demo/*"],
            )],
        );
        let resource = ResourcePath::parse("res://skillsets/demo/agent").unwrap();
        let decision = PolicyEngine::new().evaluate(
            &view,
            &resource,
            &[ActionToken::new("kubernetes.pods.list")],
        );
        assert!(decision.allowed);

        let view2 = ViewDef::new(
            "v",
            scope(),
            vec![rule(
                Intent::Allow,
                &["kubernetes.pods.list"],
                &["res://skillsets/other/*"],
            )],
        );
        let decision2 = PolicyEngine::new().evaluate(
            &view2,
            &resource,
            &[ActionToken::new("kubernetes.pods.list")],
        );
        assert!(!decision2.allowed);
    }

    #[test]
    fn determinism_across_repeated_evaluation() {
        let view = ViewDef::new(
            "v",
            scope(),
            vec![rule(
                Intent::Allow,
                &["system.catalog.read"],
                &["res://catalogs/x"],
            )],
        );
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        let action = ActionToken::new("system.catalog.read");
        let first = PolicyEngine::new().evaluate(&view, &resource, &[action.clone()]).allowed;
        for _ in 0..10 {
            let again = PolicyEngine::new().evaluate(&view, &resource, &[action.clone()]).allowed;
            assert_eq!(first, again);
        }
    }
}
