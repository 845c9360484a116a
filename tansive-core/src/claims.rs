//! Free-form claim/metadata trees used by token claims, session info, and session status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A free-form mapping from string keys to opaque JSON values.
///
/// `BTreeMap` (not `HashMap`) is used deliberately: the hashlog's canonical JSON encoding
/// (`tansive-hashlog`) relies on stable key ordering, and claim maps frequently end up inside
/// audit payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimMap(BTreeMap<String, serde_json::Value>);

impl ClaimMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Return the keys in `self` that collide with `reserved`, in encounter order.
    ///
    /// Used by the token service to reject (and log) caller-supplied claims that attempt to
    /// overwrite server-populated reserved claims such as `exp`/`iss`/`jti`.
    pub fn reserved(&self, reserved: &[&str]) -> Vec<String> {
        reserved
            .iter()
            .filter(|k| self.0.contains_key(**k))
            .map(|k| k.to_string())
            .collect()
    }

    /// Remove every key in `reserved` from this map, returning the removed entries.
    pub fn strip_reserved(&mut self, reserved: &[&str]) -> BTreeMap<String, serde_json::Value> {
        let mut removed = BTreeMap::new();
        for key in reserved {
            if let Some(value) = self.0.remove(*key) {
                removed.insert(key.to_string(), value);
            }
        }
        removed
    }

    pub fn merge(&mut self, other: ClaimMap) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ClaimMap {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, serde_json::Value)> for ClaimMap {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_detects_overlap_only() {
        let mut claims = ClaimMap::new();
        claims.insert("tenant_id", json!("t1"));
        claims.insert("scope", json!({"catalog": "c1"}));

        let hit = claims.reserved(&["tenant_id", "iss", "exp"]);
        assert_eq!(hit, vec!["tenant_id".to_string()]);
    }

    #[test]
    fn strip_reserved_removes_and_returns() {
        let mut claims = ClaimMap::new();
        claims.insert("exp", json!(123));
        claims.insert("scope", json!("x"));

        let removed = claims.strip_reserved(&["exp", "iat"]);
        assert!(removed.contains_key("exp"));
        assert!(!claims.contains_key("exp"));
        assert!(claims.contains_key("scope"));
    }

    #[test]
    fn serializes_transparently_as_object() {
        let mut claims = ClaimMap::new();
        claims.insert("a", json!(1));
        let s = serde_json::to_string(&claims).unwrap();
        assert_eq!(s, "{\"a\":1}");
    }
}
