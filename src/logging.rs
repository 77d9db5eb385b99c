//! Tracing subscriber setup.
//!
//! Human-readable lines on stderr by default; JSON lines when
//! `[logging].production` is set (or `ENVIRONMENT=PRODUCTION`) so the
//! container log driver can ship them. `RUST_LOG` overrides the filter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info,tower_http=warn";

pub fn init(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if config.production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
