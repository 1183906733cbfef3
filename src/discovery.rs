//! # Handler Discovery Module
//!
//! Scans the handlers directory for files following the
//! `{name}.handler.{ext}` convention and registers each one with the
//! dispatcher through a [`HandlerRegistrar`]. The registrar is the seam to
//! the real handler runtime; [`EchoRegistrar`] is the built-in stand-in that
//! answers every route with a reflection of the request.
//!
//! Discovery requires the module aliases to be registered first, because
//! handler sources resolve their imports through them. [`discover_handlers`]
//! enforces that ordering instead of assuming it.
//!
//! ## Hot Reload
//!
//! [`watch_handlers`] re-registers a handler when its file is modified or a
//! new file appears, without restarting the server. A handler that fails to
//! re-register is logged and skipped; the previously registered handler
//! keeps serving.

use crate::alias;
use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A handler file found by the directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHandler {
    /// Route name, the part of the file name before `.handler.`
    pub name: String,
    /// Full path to the handler source file
    pub source: PathBuf,
}

/// Errors from handler discovery and registration.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Discovery ran before alias registration. Handler sources use aliased
    /// imports, so scanning without aliases in place would register handlers
    /// that cannot resolve.
    AliasesNotRegistered,
    /// Reading the handlers directory failed.
    Io(io::Error),
    /// The registrar rejected a discovered handler.
    Registration { name: String, source: anyhow::Error },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::AliasesNotRegistered => {
                write!(f, "handler discovery requires module aliases to be registered first")
            }
            DiscoveryError::Io(e) => write!(f, "failed to scan handlers directory: {e}"),
            DiscoveryError::Registration { name, source } => {
                write!(f, "failed to register handler '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::AliasesNotRegistered => None,
            DiscoveryError::Io(e) => Some(e),
            DiscoveryError::Registration { source, .. } => Some(source.as_ref()),
        }
    }
}

impl From<io::Error> for DiscoveryError {
    fn from(e: io::Error) -> Self {
        DiscoveryError::Io(e)
    }
}

/// Extract the route name from a handler file name, if it follows the
/// `{name}.handler.{ext}` convention.
pub fn handler_name(file_name: &str) -> Option<&str> {
    let (name, ext) = file_name.split_once(".handler.")?;
    if name.is_empty() || ext.is_empty() {
        return None;
    }
    Some(name)
}

/// Scan `dir` for handler files, sorted by route name.
///
/// # Errors
///
/// [`DiscoveryError::AliasesNotRegistered`] when called before alias
/// registration, and [`DiscoveryError::Io`] when the directory cannot be
/// read, including when it does not exist.
pub fn discover_handlers(dir: &Path) -> Result<Vec<DiscoveredHandler>, DiscoveryError> {
    if !alias::registered() {
        return Err(DiscoveryError::AliasesNotRegistered);
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        match handler_name(file_name) {
            Some(name) => found.push(DiscoveredHandler {
                name: name.to_string(),
                source: entry.path(),
            }),
            None => {
                debug!(file = file_name, "skipping non-handler file");
            }
        }
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

/// Registration seam between discovered files and the dispatcher.
///
/// Implementations decide what a handler file means at runtime: compile it,
/// proxy it, or substitute a stub. Discovery stays the same either way.
pub trait HandlerRegistrar: Send + Sync {
    fn register(
        &self,
        dispatcher: &mut Dispatcher,
        handler: &DiscoveredHandler,
    ) -> anyhow::Result<()>;
}

/// Registrar that wires every discovered handler to an echo responder.
///
/// The echo reply reflects the routed handler name, method, path, query
/// parameters and body, which is enough to exercise the full pipeline before
/// real handlers exist.
pub struct EchoRegistrar;

impl HandlerRegistrar for EchoRegistrar {
    fn register(
        &self,
        dispatcher: &mut Dispatcher,
        handler: &DiscoveredHandler,
    ) -> anyhow::Result<()> {
        // SAFETY: register_handler spawns the handler coroutine; the echo
        // closure owns its captures and replies over the channel.
        unsafe {
            dispatcher.register_handler(&handler.name, echo_handler);
        }
        Ok(())
    }
}

/// Reply with a JSON reflection of the request.
pub fn echo_handler(req: HandlerRequest) {
    let body = serde_json::json!({
        "handler": req.handler_name,
        "method": req.method.as_str(),
        "path": req.path,
        "query_params": req.query_params,
        "body": req.body,
    });
    if req.reply_tx.send(HandlerResponse::json(200, body)).is_err() {
        warn!(handler_name = %req.handler_name, "echo reply channel closed");
    }
}

/// Discover handlers in `dir` and register each with the dispatcher.
/// Returns how many handlers were registered.
///
/// # Errors
///
/// Propagates discovery errors; a registrar failure aborts the load and
/// names the handler that failed.
pub fn load_handlers(
    dir: &Path,
    dispatcher: &mut Dispatcher,
    registrar: &dyn HandlerRegistrar,
) -> Result<usize, DiscoveryError> {
    let discovered = discover_handlers(dir)?;
    for handler in &discovered {
        registrar
            .register(dispatcher, handler)
            .map_err(|source| DiscoveryError::Registration {
                name: handler.name.clone(),
                source,
            })?;
        debug!(
            handler_name = %handler.name,
            source = %handler.source.display(),
            "handler registered from discovery"
        );
    }
    info!(count = discovered.len(), dir = %dir.display(), "handler discovery complete");
    Ok(discovered.len())
}

/// Watch the handlers directory and re-register handlers when their files
/// change. The returned watcher stops watching when dropped.
pub fn watch_handlers(
    dir: &Path,
    dispatcher: Arc<RwLock<Dispatcher>>,
    registrar: Arc<dyn HandlerRegistrar>,
) -> notify::Result<RecommendedWatcher> {
    let dir = dir.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    for path in &event.paths {
                        let Some(name) = path
                            .file_name()
                            .and_then(|f| f.to_str())
                            .and_then(handler_name)
                        else {
                            continue;
                        };
                        let handler = DiscoveredHandler {
                            name: name.to_string(),
                            source: path.clone(),
                        };
                        if let Ok(mut d) = dispatcher.write() {
                            match registrar.register(&mut d, &handler) {
                                Ok(()) => {
                                    info!(handler_name = name, "hot-reload: handler re-registered")
                                }
                                Err(e) => {
                                    warn!(
                                        handler_name = name,
                                        error = %e,
                                        "hot-reload: handler registration failed, keeping previous"
                                    )
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => eprintln!("watch error: {e:?}"),
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_name_convention() {
        assert_eq!(handler_name("login.handler.ts"), Some("login"));
        assert_eq!(handler_name("index.handler.mjs"), Some("index"));
        assert_eq!(handler_name("user-profile.handler.js"), Some("user-profile"));
        assert_eq!(handler_name("login.ts"), None);
        assert_eq!(handler_name("handler.ts"), None);
        assert_eq!(handler_name(".handler.ts"), None);
        assert_eq!(handler_name("login.handler."), None);
        assert_eq!(handler_name("README.md"), None);
    }
}
