use std::fmt;

/// Bootstrap steps, in execution order.
///
/// Every step is named so failures report which part of the sequence broke,
/// and so tests can assert on ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Register module path aliases
    Aliases,
    /// Install the middleware stack
    Middleware,
    /// Start the development asset bridge (skipped in production)
    DevBridge,
    /// Bind the app back-reference onto the service
    Context,
    /// Discover and register route handlers
    Handlers,
    /// Register static asset mounts
    StaticAssets,
    /// Bind and listen (skipped in test mode)
    Listen,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Aliases => "aliases",
            Stage::Middleware => "middleware",
            Stage::DevBridge => "dev-bridge",
            Stage::Context => "context",
            Stage::Handlers => "handlers",
            Stage::StaticAssets => "static-assets",
            Stage::Listen => "listen",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from assembling or starting the application.
#[derive(Debug)]
pub enum BootstrapError {
    /// `listen` was called while the server is already bound. Carries the
    /// port the running server is listening on.
    AlreadyRunning { port: u16 },
    /// A bootstrap step failed; the sequence stops at the first failure.
    Stage { stage: Stage, source: anyhow::Error },
}

impl BootstrapError {
    pub fn stage(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        BootstrapError::Stage {
            stage,
            source: source.into(),
        }
    }
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::AlreadyRunning { port } => {
                write!(f, "app is already listening on port {port}")
            }
            BootstrapError::Stage { stage, source } => {
                write!(f, "bootstrap stage '{stage}' failed: {source}")
            }
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::AlreadyRunning { .. } => None,
            BootstrapError::Stage { source, .. } => Some(source.as_ref()),
        }
    }
}
