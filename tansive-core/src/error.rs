//! Error taxonomy for the Tansive control plane.
//!
//! One `thiserror`-derived sub-enum per concern, folded into a master `CoreError` via `#[from]`.
//! Each crate downstream of `tansive-core` adds
//! its own sub-enum (e.g. `tansive-catalog::CatalogStoreError`) and converts into these shared
//! variants at its boundary; the HTTP layer (`tansive-server`/`tansive-tangent`) is the single
//! place that maps any of this tree onto the wire-level error code taxonomy.

use thiserror::Error;

/// Policy engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("action '{action}' on '{resource}' was denied by policy")]
    Denied { action: String, resource: String },
}

/// Token minting/validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("no active signing key is available")]
    NoActiveKey,

    #[error("signing key '{kid}' not found")]
    UnknownKey { kid: String },

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {reason}")]
    Malformed { reason: String },

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("reserved claim(s) cannot be overridden by caller: {claims:?}")]
    ReservedClaimOverride { claims: Vec<String> },

    #[error("signing key store failed: {reason}")]
    StoreFailure { reason: String },
}

/// Catalog / repository errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("{entity} '{name}' already exists")]
    AlreadyExists { entity: String, name: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("catalog object with hash '{hash}' still referenced by {refs} directory entries")]
    StillReferenced { hash: String, refs: usize },

    #[error("session '{id}' is already finalized")]
    SessionAlreadyFinalized { id: String },
}

/// Catalog-server-side session lifecycle and view-adoption errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("auth code not found or already redeemed")]
    InvalidAuthCode,

    #[error("auth code has expired")]
    AuthCodeExpired,

    #[error("auth code verifier does not match the registered challenge")]
    AuthCodeVerifierMismatch,

    #[error("view '{label}' not found on catalog '{catalog}'")]
    ViewNotFound { catalog: String, label: String },

    #[error("adopting view '{label}' was denied by policy")]
    AdoptionDenied { label: String },
}

/// Tangent-side session runtime errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("invocation id '{id}' is unknown")]
    InvalidInvocationId { id: String },

    #[error("skillset '{path}' not found")]
    SkillsetNotFound { path: String },

    #[error("skill '{name}' not found in skillset '{skillset}'")]
    SkillNotFound { name: String, skillset: String },

    #[error("blocked by policy: {reason}")]
    BlockedByPolicy { reason: String },

    #[error("javascript transform timed out after {budget_ms}ms")]
    JsRuntimeTimeout { budget_ms: u64 },

    #[error("javascript transform failed: {reason}")]
    JsExecutionError { reason: String },

    #[error("input failed schema validation: {reason}")]
    ValidationError { reason: String },

    #[error("unknown runner id '{runner_id}'")]
    InvalidRunner { runner_id: String },

    #[error("loop detected: tool '{tool}' already present in call ancestry")]
    LoopDetected { tool: String },

    #[error("call depth limit of {limit} exceeded")]
    DepthExceeded { limit: usize },

    #[error("runner failed: {summary}")]
    RunnerError { summary: String },

    #[error("request to catalog server failed with status {status}: {message}")]
    UpstreamError { status: u16, message: String },
}

/// Cryptographic primitive errors (AEAD, key derivation).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("plaintext must not be empty")]
    EmptyPlaintext,

    #[error("ciphertext blob is malformed: {reason}")]
    MalformedBlob { reason: String },

    #[error("unsupported blob version byte {version}")]
    UnsupportedVersion { version: u8 },

    #[error("decryption failed (tamper detected or wrong password)")]
    DecryptionFailed,

    #[error("key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },
}

/// Hash-chained audit log errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HashlogError {
    #[error("invalid private key length: expected {expected}, got {got}")]
    InvalidPrivateKeyLength { expected: usize, got: usize },

    #[error("writer is closed")]
    WriterClosed,

    #[error("chain broken at line {line}: {reason}")]
    ChainBroken { line: usize, reason: String },

    #[error("signature invalid at line {line}")]
    SignatureInvalid { line: usize },

    #[error("malformed entry at line {line}: {reason}")]
    MalformedEntry { line: usize, reason: String },

    #[error("io error: {0}")]
    Io(String),
}

/// Master error type composing every sub-taxonomy.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("hashlog error: {0}")]
    Hashlog(#[from] HashlogError),
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
