//! Resource path and action token types shared by the policy engine, catalog, and session
//! crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Valid resource kinds. `Resources` and `Views` are reserved — they are valid resource kinds
/// for addressing but are never valid *admin* targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Catalogs,
    Variants,
    Namespaces,
    Skillsets,
    Resources,
    Views,
}

impl ResourceKind {
    /// Kinds against which an admin rule's action (`system.<kind>.admin`) may shortcut.
    ///
    /// `skillsets` is deliberately absent: skillsets have no `system.skillset.admin`-bearing
    /// shortcut in the decision algorithm; they must go through explicit per-action evaluation.
    pub fn is_admin_bearing(self) -> bool {
        matches!(
            self,
            ResourceKind::Catalogs | ResourceKind::Variants | ResourceKind::Namespaces
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Catalogs => "catalogs",
            ResourceKind::Variants => "variants",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Skillsets => "skillsets",
            ResourceKind::Resources => "resources",
            ResourceKind::Views => "views",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "catalogs" => Some(ResourceKind::Catalogs),
            "variants" => Some(ResourceKind::Variants),
            "namespaces" => Some(ResourceKind::Namespaces),
            "skillsets" => Some(ResourceKind::Skillsets),
            "resources" => Some(ResourceKind::Resources),
            "views" => Some(ResourceKind::Views),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing a resource path or pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourcePathParseError {
    #[error("resource path must start with 'res://'")]
    MissingScheme,
    #[error("resource path has no segments after the scheme")]
    Empty,
    #[error("'*' may only appear as the final segment")]
    MisplacedWildcard,
}

/// A resource path or target pattern of the form `res://<kind>/<seg1>/<seg2>/...`.
///
/// The terminal segment may be a literal `*`, meaning "exactly one additional segment" when used
/// as a rule target. Case is preserved and compared exactly; malformed targets are represented as
/// `None` at parse time rather than surfaced as errors further down the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    raw: String,
    kind_str: String,
    segments: Vec<String>,
}

impl ResourcePath {
    pub const SCHEME: &'static str = "res://";

    /// Parse a resource path or pattern. Only rejects structurally invalid input (missing
    /// scheme, no segments, or a non-terminal `*`); unknown kinds parse successfully (they simply
    /// never match anything against a known-kind resource, and admin shortcuts treat unknown
    /// kinds as non-admin-bearing).
    pub fn parse(s: &str) -> Result<Self, ResourcePathParseError> {
        let rest = s
            .strip_prefix(Self::SCHEME)
            .ok_or(ResourcePathParseError::MissingScheme)?;
        if rest.is_empty() {
            return Err(ResourcePathParseError::Empty);
        }
        let segments: Vec<String> = rest.split('/').map(|s| s.to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResourcePathParseError::Empty);
        }
        for (i, seg) in segments.iter().enumerate() {
            if seg.contains('*') && (seg.as_str() != "*" || i != segments.len() - 1) {
                return Err(ResourcePathParseError::MisplacedWildcard);
            }
        }
        let kind_str = segments[0].clone();
        Ok(Self {
            raw: s.to_string(),
            kind_str,
            segments: segments[1..].to_vec(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed resource kind, if it is one of the known kinds.
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::parse(&self.kind_str)
    }

    /// The raw kind segment string, regardless of whether it is a known kind.
    pub fn kind_str(&self) -> &str {
        &self.kind_str
    }

    /// Segments after the kind.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn ends_in_wildcard(&self) -> bool {
        self.segments.last().map(|s| s == "*").unwrap_or(false)
    }

    /// Does `self` (used as a rule target pattern) match `resource`?
    ///
    /// Match rules:
    /// - kind segment must be identical (string compare, not just `ResourceKind` equality, so an
    ///   unknown-kind target never accidentally matches a known-kind resource or vice versa),
    /// - segment counts equal, OR
    /// - target ends in `*` and resource has exactly one more segment than the target up to the
    ///   `*` (the `*` consumes exactly one additional segment).
    pub fn matches(&self, resource: &ResourcePath) -> bool {
        if self.kind_str != resource.kind_str {
            return false;
        }
        if self.ends_in_wildcard() {
            let prefix_len = self.segments.len() - 1;
            resource.segments.len() == prefix_len + 1
                && self.segments[..prefix_len] == resource.segments[..prefix_len]
        } else {
            self.segments == resource.segments
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for ResourcePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourcePath::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A dotted action token, e.g. `system.skillset.run` or `system.catalog.admin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionToken(String);

impl ActionToken {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Is this one of the five admin-root actions (`system.<kind>.admin`)?
    pub fn is_admin_action(&self) -> bool {
        matches!(
            self.0.as_str(),
            "system.catalog.admin"
                | "system.variant.admin"
                | "system.namespace.admin"
                | "system.skillset.admin"
                | "system.view.admin"
        )
    }

    /// The resource kind an admin action grants, if this is an admin-bearing action recognized
    /// by the decision algorithm's shortcut (catalog/variant/namespace only).
    pub fn admin_kind(&self) -> Option<ResourceKind> {
        match self.0.as_str() {
            "system.catalog.admin" => Some(ResourceKind::Catalogs),
            "system.variant.admin" => Some(ResourceKind::Variants),
            "system.namespace.admin" => Some(ResourceKind::Namespaces),
            _ => None,
        }
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_requires_equal_segment_count() {
        let target = ResourcePath::parse("res://catalogs/x").unwrap();
        let resource = ResourcePath::parse("res://catalogs/x").unwrap();
        assert!(target.matches(&resource));

        let longer = ResourcePath::parse("res://catalogs/x/variants/y").unwrap();
        assert!(!target.matches(&longer));
    }

    #[test]
    fn terminal_wildcard_consumes_exactly_one_segment() {
        let target = ResourcePath::parse("res://skillsets/demo/*").unwrap();
        let one_more = ResourcePath::parse("res://skillsets/demo/agent").unwrap();
        assert!(target.matches(&one_more));

        let two_more = ResourcePath::parse("res://skillsets/demo/agent/extra").unwrap();
        assert!(!target.matches(&two_more));

        let zero_more = ResourcePath::parse("res://skillsets/demo").unwrap();
        assert!(!target.matches(&zero_more));
    }

    #[test]
    fn nested_admin_target_matches_only_within_wildcard_budget() {
        let target = ResourcePath::parse("res://catalogs/x/variants/y/namespaces/*").unwrap();
        let matches = ResourcePath::parse("res://catalogs/x/variants/y/namespaces/z").unwrap();
        assert!(target.matches(&matches));

        let exact = ResourcePath::parse("res://catalogs/x/variants/y/namespaces/z").unwrap();
        let short_target = ResourcePath::parse("res://catalogs/x/variants/y/namespaces/z").unwrap();
        assert!(short_target.matches(&exact));
    }

    #[test]
    fn non_terminal_wildcard_is_rejected_at_parse_time() {
        let err = ResourcePath::parse("res://catalogs/*/variants/y");
        assert_eq!(err, Err(ResourcePathParseError::MisplacedWildcard));
    }

    #[test]
    fn different_kind_never_matches() {
        let target = ResourcePath::parse("res://catalogs/x").unwrap();
        let resource = ResourcePath::parse("res://variants/x").unwrap();
        assert!(!target.matches(&resource));
    }

    #[test]
    fn missing_scheme_is_rejected() {
        assert_eq!(
            ResourcePath::parse("catalogs/x"),
            Err(ResourcePathParseError::MissingScheme)
        );
    }

    #[test]
    fn admin_action_recognizes_admin_bearing_kind() {
        let admin: ActionToken = "system.catalog.admin".into();
        assert!(admin.is_admin_action());
        assert_eq!(admin.admin_kind(), Some(ResourceKind::Catalogs));

        let skillset_admin: ActionToken = "system.skillset.admin".into();
        assert!(skillset_admin.is_admin_action());
        assert_eq!(skillset_admin.admin_kind(), None);
    }

    #[test]
    fn reserved_kinds_are_never_admin_bearing() {
        assert!(!ResourceKind::Resources.is_admin_bearing());
        assert!(!ResourceKind::Views.is_admin_bearing());
        assert!(!ResourceKind::Skillsets.is_admin_bearing());
    }
}
