//! Tangent-side session runtime: skill resolution, policy enforcement at every invocation,
//! JS transform sandboxing, runner dispatch, call-graph tracking, and audit wiring.
//!
//! This is the TG-side half of the session lifecycle; the CS-side half (create/update/finalize,
//! PKCE handoff, view adoption) lives in `tansive-session`.

mod js_transform;
mod session;
mod skillset_source;

pub use js_transform::{JsTransform, NodeJsTransform, JS_TRANSFORM_BUDGET_MS};
pub use session::{SessionRuntime, FINALIZATION_TIMEOUT, SHUTDOWN_GRACE};
pub use skillset_source::{CachedSkillsetSource, HttpSkillsetSource, SkillsetSource};
