//! Structured logging setup.
//!
//! One subscriber for the whole process: JSON output in production, human
//! readable output everywhere else, with `RUST_LOG` taking precedence over the
//! mode-derived default level. Initialization is idempotent so test fixtures
//! can call it from every binary without coordinating.

use crate::config::ExecutionMode;
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log output format: JSON for production, pretty-print for development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    /// Format implied by the execution mode, overridable via
    /// `GANTRY_LOG_FORMAT`.
    pub fn from_mode(mode: ExecutionMode) -> Self {
        match env::var("GANTRY_LOG_FORMAT") {
            Ok(v) => LogFormat::parse(&v),
            Err(_) if mode.is_production() => LogFormat::Json,
            Err(_) => LogFormat::Pretty,
        }
    }
}

/// Install the global tracing subscriber. Test mode defaults to `warn` so
/// test output stays readable; `RUST_LOG` overrides either default. Calling
/// this twice is a no-op.
pub fn init(mode: ExecutionMode) {
    let default_level = if mode.is_test() { "warn" } else { "info" };
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Per-connection chatter from the embedded http server stays at warn.
    if let Ok(directive) = "may_minihttp=warn".parse() {
        filter = filter.add_directive(directive);
    }

    let fmt_layer = match LogFormat::from_mode(mode) {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed(),
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        // A subscriber is already installed; keep it.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }
}
