//! Module path aliases.
//!
//! The application layout exposes four aliases that the rest of the system
//! resolves source references against:
//!
//! | alias     | target             |
//! |-----------|--------------------|
//! | `@root`   | application root   |
//! | `@client` | `src/client`       |
//! | `@server` | `src/server`       |
//! | `@shared` | `src/shared`       |
//!
//! Registration is process-wide and happens exactly once, as the first
//! bootstrap step. Handler discovery treats a registered map as a hard
//! precondition and refuses to run without it, because discovered handler
//! sources are reported relative to these roots.

use crate::paths::AppPaths;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The four supported alias names, in registration order.
pub const ALIAS_NAMES: [&str; 4] = ["@root", "@client", "@server", "@shared"];

/// Immutable alias table mapping `@name` prefixes to directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMap {
    root: PathBuf,
    client: PathBuf,
    server: PathBuf,
    shared: PathBuf,
}

impl AliasMap {
    pub fn new(paths: &AppPaths) -> Self {
        AliasMap {
            root: paths.root.clone(),
            client: paths.client_src.clone(),
            server: paths.server_src.clone(),
            shared: paths.shared_src.clone(),
        }
    }

    /// Target directory for a bare alias name, e.g. `"@shared"`.
    pub fn target(&self, alias: &str) -> Option<&Path> {
        match alias {
            "@root" => Some(&self.root),
            "@client" => Some(&self.client),
            "@server" => Some(&self.server),
            "@shared" => Some(&self.shared),
            _ => None,
        }
    }

    /// Resolve an aliased reference like `@server/handlers/login.handler.ts`
    /// to a filesystem path. Returns `None` when the reference does not start
    /// with a known alias.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let (alias, rest) = match reference.split_once('/') {
            Some((alias, rest)) => (alias, Some(rest)),
            None => (reference, None),
        };
        let base = self.target(alias)?;
        Some(match rest {
            Some(rest) if !rest.is_empty() => base.join(rest),
            _ => base.to_path_buf(),
        })
    }

    /// Application root this map was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

static REGISTRY: OnceCell<AliasMap> = OnceCell::new();

/// Register the process-wide alias map. The first call wins; later calls with
/// a different root log a warning and return the map already in place.
pub fn register(paths: &AppPaths) -> &'static AliasMap {
    let map = REGISTRY.get_or_init(|| {
        info!(root = %paths.root.display(), "registering module aliases");
        AliasMap::new(paths)
    });
    if map.root() != paths.root {
        warn!(
            registered = %map.root().display(),
            requested = %paths.root.display(),
            "module aliases already registered for a different root; keeping the first registration"
        );
    }
    map
}

/// Whether the process-wide alias map has been registered.
pub fn registered() -> bool {
    REGISTRY.get().is_some()
}

/// The process-wide alias map, if registered.
pub fn current() -> Option<&'static AliasMap> {
    REGISTRY.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> AliasMap {
        AliasMap::new(&AppPaths::from_root("/srv/app"))
    }

    #[test]
    fn test_targets() {
        let m = map();
        assert_eq!(m.target("@root"), Some(Path::new("/srv/app")));
        assert_eq!(m.target("@client"), Some(Path::new("/srv/app/src/client")));
        assert_eq!(m.target("@server"), Some(Path::new("/srv/app/src/server")));
        assert_eq!(m.target("@shared"), Some(Path::new("/srv/app/src/shared")));
        assert_eq!(m.target("@vendor"), None);
    }

    #[test]
    fn test_resolve_with_suffix() {
        let m = map();
        assert_eq!(
            m.resolve("@server/handlers/login.handler.ts"),
            Some(PathBuf::from("/srv/app/src/server/handlers/login.handler.ts"))
        );
        assert_eq!(
            m.resolve("@shared/types.ts"),
            Some(PathBuf::from("/srv/app/src/shared/types.ts"))
        );
    }

    #[test]
    fn test_resolve_bare_alias() {
        let m = map();
        assert_eq!(m.resolve("@client"), Some(PathBuf::from("/srv/app/src/client")));
        assert_eq!(m.resolve("@client/"), Some(PathBuf::from("/srv/app/src/client")));
    }

    #[test]
    fn test_resolve_unknown_prefix() {
        let m = map();
        assert_eq!(m.resolve("@vendor/lib.ts"), None);
        assert_eq!(m.resolve("src/client/app.ts"), None);
    }
}
