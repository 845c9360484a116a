//! Type-safe entity identifiers.
//!
//! Every persisted row in the control plane is addressed by a newtype wrapper over a UUIDv4 (or
//! UUIDv7 where insertion order matters). The `EntityIdType` trait and `define_entity_id!` macro
//! give each identifier compile-time type safety so a `ViewId` can never be passed where a
//! `SessionId` is expected, even though both are UUIDs underneath.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use uuid::Uuid;

/// Trait for type-safe entity IDs.
pub trait EntityIdType:
    Copy
    + Clone
    + Eq
    + PartialEq
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr
    + Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// The name of the entity type (e.g. "tenant", "session").
    const ENTITY_NAME: &'static str;

    /// Create a new ID from a UUID.
    fn new(uuid: Uuid) -> Self;

    /// Get the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Create a nil (all zeros) ID.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }

    /// Create a new timestamp-sortable UUIDv7 ID (used for rows whose insertion order matters,
    /// e.g. sessions and catalog objects).
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Create a new random UUIDv4 ID.
    fn new_v4() -> Self {
        Self::new(Uuid::new_v4())
    }
}

/// Error type for parsing entity IDs from strings.
#[derive(Debug, Clone)]
pub struct EntityIdParseError {
    pub entity_name: &'static str,
    pub input: String,
    pub source: uuid::Error,
}

impl fmt::Display for EntityIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to parse {} id from '{}': {}",
            self.entity_name, self.input, self.source
        )
    }
}

impl std::error::Error for EntityIdParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

macro_rules! define_entity_id {
    ($name:ident, $entity:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = EntityIdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self::new)
                    .map_err(|e| EntityIdParseError {
                        entity_name: Self::ENTITY_NAME,
                        input: s.to_string(),
                        source: e,
                    })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Uuid::deserialize(deserializer).map(Self::new)
            }
        }
    };
}

define_entity_id!(TenantId, "tenant", "Root scoping identifier for a tenant.");
define_entity_id!(ProjectId, "project", "Identifier for a project under a tenant.");
define_entity_id!(CatalogId, "catalog", "Identifier for a catalog.");
define_entity_id!(VariantId, "variant", "Identifier for a variant within a catalog.");
define_entity_id!(ViewId, "view", "Identifier for a view (scoped rule set).");
define_entity_id!(SessionId, "session", "Identifier for a skill execution session.");
define_entity_id!(TangentId, "tangent", "Identifier for a registered tangent (executor host).");
define_entity_id!(
    SigningKeyId,
    "signing_key",
    "Identifier (`kid`) for an Ed25519 token-signing key."
);
define_entity_id!(
    SkillsetObjectId,
    "skillset_object",
    "Identifier for a skillset catalog object."
);
define_entity_id!(
    ResourceObjectId,
    "resource_object",
    "Identifier for a resource catalog object."
);
define_entity_id!(ViewTokenId, "view_token", "JTI for a minted view-adoption token.");

/// Timestamp type used throughout the control plane; millisecond resolution or better.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Duration in milliseconds, used for TTL and timeout fields that travel through JSON.
pub type DurationMs = i64;

/// SHA-256 content hash used for content-addressed catalog objects.
pub type ContentHash = [u8; 32];

/// Raw binary content, e.g. a compressed catalog object payload.
pub type RawContent = Vec<u8>;

/// Compute the SHA-256 hash of a byte slice.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_do_not_collide_across_types() {
        let tenant = TenantId::now_v7();
        let session = SessionId::now_v7();
        assert_ne!(tenant.as_uuid(), session.as_uuid());
    }

    #[test]
    fn entity_id_round_trips_through_string() {
        let view = ViewId::new_v4();
        let s = view.to_string();
        let parsed: ViewId = s.parse().expect("valid uuid parses");
        assert_eq!(view, parsed);
    }

    #[test]
    fn entity_id_parse_error_names_entity() {
        let err: Result<TangentId, _> = "not-a-uuid".parse();
        let err = err.unwrap_err();
        assert_eq!(err.entity_name, "tangent");
    }

    #[test]
    fn entity_id_serializes_as_bare_uuid_string() {
        let id = CatalogId::nil();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = compute_content_hash(b"hello");
        let b = compute_content_hash(b"hello");
        assert_eq!(a, b);
        let c = compute_content_hash(b"world");
        assert_ne!(a, c);
    }
}
