//! Skillset payload shape: the deserialized contents of a `CatalogObject` whose `object_type` is
//! `ObjectKind::Skillset`.
//!
//! A skillset enumerates its runner sources, the skills it exports, declared context entries,
//! and the skillsets it depends on. This module gives that payload concrete Rust shape so
//! `tansive-runtime` can resolve and invoke a skill without re-parsing a generic JSON blob at
//! every call site.

use serde::{Deserialize, Serialize};

/// A runner source a skillset's skills may reference by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSource {
    pub runner_id: String,
    pub config: serde_json::Value,
}

/// A single invocable capability within a skillset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub name: String,
    pub description: String,
    /// Name of the `SkillSource` (by `runner_id`) this skill dispatches to.
    pub source_ref: String,
    pub input_schema: serde_json::Value,
    pub output_schema: serde_json::Value,
    /// Optional JavaScript transform source, evaluated before input validation.
    pub transform: Option<String>,
    pub exported_actions: Vec<String>,
}

/// A declared context entry: a named, schema-typed value available to a skillset's transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub name: String,
    pub schema: serde_json::Value,
    pub value: serde_json::Value,
}

/// The full skillset payload stored (compressed) as a `CatalogObject`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skillset {
    pub path: String,
    pub sources: Vec<SkillSource>,
    pub skills: Vec<SkillDef>,
    pub context: Vec<ContextEntry>,
    pub dependencies: Vec<String>,
}

impl Skillset {
    pub fn find_skill(&self, name: &str) -> Option<&SkillDef> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn find_source(&self, source_ref: &str) -> Option<&SkillSource> {
        self.sources.iter().find(|s| s.runner_id == source_ref)
    }
}

/// Indexed sidecar stored alongside a skillset object: a short summary plus the skill name list,
/// so a catalog listing can be rendered without decompressing and parsing the full payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsetMetadata {
    pub summary: String,
    pub skills: Vec<String>,
}

impl From<&Skillset> for SkillsetMetadata {
    fn from(skillset: &Skillset) -> Self {
        Self {
            summary: format!("{} ({} skills)", skillset.path, skillset.skills.len()),
            skills: skillset.skills.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skillset() -> Skillset {
        Skillset {
            path: "demo/agent".to_string(),
            sources: vec![SkillSource { runner_id: "system.stdiorunner".to_string(), config: serde_json::json!({}) }],
            skills: vec![SkillDef {
                name: "list-pods".to_string(),
                description: "lists pods".to_string(),
                source_ref: "system.stdiorunner".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                transform: None,
                exported_actions: vec!["kubernetes.pods.list".to_string()],
            }],
            context: vec![],
            dependencies: vec![],
        }
    }

    #[test]
    fn find_skill_by_name() {
        let s = skillset();
        assert!(s.find_skill("list-pods").is_some());
        assert!(s.find_skill("missing").is_none());
    }

    #[test]
    fn metadata_indexes_skill_names() {
        let s = skillset();
        let meta = SkillsetMetadata::from(&s);
        assert_eq!(meta.skills, vec!["list-pods".to_string()]);
    }
}
