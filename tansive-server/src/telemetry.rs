//! Structured logging bootstrap: an `EnvFilter` driven by `RUST_LOG`/`TANSIVE_LOG`, formatted
//! as JSON in production and human-readable in development.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global `tracing` subscriber. Safe to call once at process startup; a second
/// call is a no-op (the underlying `set_global_default` error is swallowed, tolerating repeated
/// init in integration tests).
pub fn init(pretty: bool) {
    let filter = EnvFilter::try_from_env("TANSIVE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt().with_env_filter(filter);
    let result = if pretty {
        subscriber.pretty().try_init()
    } else {
        subscriber.json().try_init()
    };

    if let Err(err) = result {
        eprintln!("tracing subscriber already initialized: {err}");
    }
}
