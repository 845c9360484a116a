//! Core data model and error taxonomy for the Tansive control plane.
//!
//! This crate has no knowledge of HTTP, persistence, or process execution. It defines the
//! vocabulary every other crate in the workspace shares: typed entity identifiers, the policy
//! data model (scopes, rules, resource patterns), claim maps, and the error taxonomy from which
//! every other crate's errors are composed.

pub mod claims;
pub mod error;
pub mod identity;
pub mod resource;
pub mod scope;

pub use claims::ClaimMap;
pub use error::{
    CatalogError, CoreError, CoreResult, CryptoError, HashlogError, PolicyError, RuntimeError,
    SessionError, TokenError,
};
pub use identity::{
    compute_content_hash, CatalogId, ContentHash, DurationMs, EntityIdType, EntityIdParseError,
    ProjectId, RawContent, ResourceObjectId, SessionId, SigningKeyId, SkillsetObjectId, TangentId,
    TenantId, Timestamp, VariantId, ViewId, ViewTokenId,
};
pub use resource::{ActionToken, ResourcePath, ResourcePathParseError};
pub use scope::Scope;
