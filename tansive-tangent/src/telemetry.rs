//! Structured logging bootstrap, shared in shape with `tansive_server::telemetry::init`.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(pretty: bool) {
    let filter = EnvFilter::try_from_env("TANSIVE_LOG").or_else(|_| EnvFilter::try_from_default_env()).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt().with_env_filter(filter);
    let result = if pretty { subscriber.pretty().try_init() } else { subscriber.json().try_init() };

    if let Err(err) = result {
        eprintln!("tracing subscriber already initialized: {err}");
    }
}
