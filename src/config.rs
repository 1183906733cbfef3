//! # Application Configuration Module
//!
//! Environment-variable based configuration, resolved once at process start and
//! threaded explicitly into the bootstrap sequencer. Nothing here is re-read
//! after startup, so the execution mode cannot change mid-bootstrap.
//!
//! ## Environment Variables
//!
//! | variable            | meaning                                   | default     |
//! |---------------------|-------------------------------------------|-------------|
//! | `PORT`              | listen port                               | `7456`      |
//! | `HOST`              | listen host                               | `0.0.0.0`   |
//! | `GANTRY_APP_ROOT`   | application root directory                | current dir |
//! | `GANTRY_ENV`        | `"production"` / `"test"` mode marker     | unset       |
//! | `GANTRY_TEST_BUILD` | test-build flag (any non-empty value)     | unset       |
//! | `GANTRY_STACK_SIZE` | coroutine stack size, decimal or `0x` hex | `0x10000`   |

use std::env;
use std::path::PathBuf;

/// Default listen port when `PORT` is unset or unparseable.
pub const DEFAULT_PORT: u16 = 7456;

/// Default listen host when `HOST` is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default coroutine stack size (64 KB), overridable via `GANTRY_STACK_SIZE`.
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Execution mode, classified once from the environment.
///
/// The production and test markers are independent facts, not variants of one
/// enum: `GANTRY_ENV=production` plus a set `GANTRY_TEST_BUILD` yields a mode
/// where `is_production()` *and* `is_test()` both hold. Bootstrap consults each
/// query at its own step (production skips the dev bridge, test skips listen),
/// so both effects apply when both markers are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionMode {
    production: bool,
    test: bool,
}

impl ExecutionMode {
    /// Classify from raw marker values. `env_value` is the `GANTRY_ENV`
    /// content; `test_build` is the raw `GANTRY_TEST_BUILD` content, counted
    /// as set when non-empty.
    pub fn classify(env_value: Option<&str>, test_build: Option<&str>) -> Self {
        let production = env_value == Some("production");
        let test = env_value == Some("test") || test_build.is_some_and(|v| !v.is_empty());
        Self { production, test }
    }

    /// Read the markers from the process environment.
    pub fn from_env() -> Self {
        let env_value = env::var("GANTRY_ENV").ok();
        let test_build = env::var("GANTRY_TEST_BUILD").ok();
        Self::classify(env_value.as_deref(), test_build.as_deref())
    }

    pub fn development() -> Self {
        Self {
            production: false,
            test: false,
        }
    }

    pub fn production() -> Self {
        Self {
            production: true,
            test: false,
        }
    }

    pub fn test() -> Self {
        Self {
            production: false,
            test: true,
        }
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    pub fn is_test(&self) -> bool {
        self.test
    }

    /// Human-readable mode label for logs. Production wins when both markers
    /// are set, mirroring the step precedence (the dev-bridge skip applies
    /// first; the listen skip is evaluated independently).
    pub fn label(&self) -> &'static str {
        if self.production {
            "production"
        } else if self.test {
            "test"
        } else {
            "development"
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Application configuration resolved from environment variables.
///
/// Load this at startup with [`AppConfig::from_env()`] and hand it to
/// [`crate::app::App::bootstrap`]; tests construct it directly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen host (default `0.0.0.0`)
    pub host: String,
    /// Listen port (default `7456`)
    pub port: u16,
    /// Application root directory all fixed paths hang off
    pub root: PathBuf,
    /// Execution mode, classified once
    pub mode: ExecutionMode,
    /// Coroutine stack size in bytes (default 64 KB)
    pub stack_size: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let root = env::var("GANTRY_APP_ROOT")
            .map(PathBuf::from)
            .or_else(|_| env::current_dir())
            .unwrap_or_else(|_| PathBuf::from("."));
        let stack_size = parse_stack_size(env::var("GANTRY_STACK_SIZE").ok().as_deref());
        AppConfig {
            host,
            port,
            root,
            mode: ExecutionMode::from_env(),
            stack_size,
        }
    }

    /// Configuration for a given root with everything else at defaults.
    /// Handy in tests and embedders that do not drive the environment.
    pub fn with_root<P: Into<PathBuf>>(root: P, mode: ExecutionMode) -> Self {
        AppConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            root: root.into(),
            mode,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Parse a stack size value in decimal or `0x` hex; invalid input falls back
/// to the default.
pub fn parse_stack_size(val: Option<&str>) -> usize {
    match val {
        Some(v) => {
            if let Some(hex) = v.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_STACK_SIZE)
            } else {
                v.parse().unwrap_or(DEFAULT_STACK_SIZE)
            }
        }
        None => DEFAULT_STACK_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_development_by_default() {
        let mode = ExecutionMode::classify(None, None);
        assert!(!mode.is_production());
        assert!(!mode.is_test());
        assert_eq!(mode.label(), "development");
    }

    #[test]
    fn test_classify_production_marker() {
        let mode = ExecutionMode::classify(Some("production"), None);
        assert!(mode.is_production());
        assert!(!mode.is_test());
    }

    #[test]
    fn test_classify_test_marker() {
        let mode = ExecutionMode::classify(Some("test"), None);
        assert!(!mode.is_production());
        assert!(mode.is_test());
    }

    #[test]
    fn test_classify_test_build_flag() {
        assert!(ExecutionMode::classify(None, Some("1")).is_test());
        // Presence-style flag: any non-empty value counts.
        assert!(ExecutionMode::classify(None, Some("false")).is_test());
        assert!(!ExecutionMode::classify(None, Some("")).is_test());
    }

    #[test]
    fn test_classify_both_markers() {
        let mode = ExecutionMode::classify(Some("production"), Some("1"));
        assert!(mode.is_production());
        assert!(mode.is_test());
        assert_eq!(mode.label(), "production");
    }

    #[test]
    fn test_classify_unrecognized_value() {
        let mode = ExecutionMode::classify(Some("staging"), None);
        assert_eq!(mode.label(), "development");
    }

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size(None), DEFAULT_STACK_SIZE);
        assert_eq!(parse_stack_size(Some("32768")), 32768);
        assert_eq!(parse_stack_size(Some("0x8000")), 0x8000);
        assert_eq!(parse_stack_size(Some("bogus")), DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_with_root_defaults() {
        let cfg = AppConfig::with_root("/srv/app", ExecutionMode::test());
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert!(cfg.mode.is_test());
    }
}
