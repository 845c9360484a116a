//! Clock abstraction for token time validation.
//!
//! Owning time validation ourselves (rather than delegating to a JWT library) keeps token
//! expiry/not-before checks deterministic in tests and immune to CI clock skew.

/// Clock abstraction used for `iat`/`exp`/`nbf` handling.
pub trait TokenClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TokenClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl TokenClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}
