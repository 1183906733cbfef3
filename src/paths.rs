//! Fixed directory layout under the application root.
//!
//! Every path the bootstrap sequence touches is derived here, once, from the
//! configured root. Steps receive [`AppPaths`] and never rebuild paths from
//! strings, so the layout is stated in exactly one place.

use std::env;
use std::path::{Path, PathBuf};

/// Resolve a logical path against the application root. Absolute inputs are
/// returned untouched; relative inputs are joined onto the root.
pub fn resolve_app_path<P: AsRef<Path>>(root: &Path, logical: P) -> PathBuf {
    let logical = logical.as_ref();
    if logical.is_absolute() {
        logical.to_path_buf()
    } else {
        root.join(logical)
    }
}

/// The well-known directories of an application checkout.
///
/// None of these are required to exist; steps that depend on one check for it
/// explicitly (static mounts probe `assets`, the stylesheet inliner probes
/// `dist_assets`) and skip when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Application root directory (absolute once constructed)
    pub root: PathBuf,
    /// Public assets served under `/assets/` in every mode
    pub assets: PathBuf,
    /// Built stylesheet output consumed by the inliner
    pub dist_assets: PathBuf,
    /// Built client bundle, mounted at `/` in production only
    pub dist_client: PathBuf,
    /// Request handler modules picked up by discovery
    pub handlers: PathBuf,
    /// Client source tree (`@client` alias target)
    pub client_src: PathBuf,
    /// Server source tree (`@server` alias target)
    pub server_src: PathBuf,
    /// Shared source tree (`@shared` alias target)
    pub shared_src: PathBuf,
}

impl AppPaths {
    /// Build the layout from a root directory. A relative root is absolutized
    /// against the current directory so a later working-directory change
    /// cannot shift the layout.
    pub fn from_root<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };
        AppPaths {
            assets: root.join("assets"),
            dist_assets: root.join("dist").join("assets"),
            dist_client: root.join("dist").join("client"),
            handlers: root.join("src").join("server").join("handlers"),
            client_src: root.join("src").join("client"),
            server_src: root.join("src").join("server"),
            shared_src: root.join("src").join("shared"),
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_joins_root() {
        let root = Path::new("/srv/app");
        assert_eq!(
            resolve_app_path(root, "dist/assets"),
            PathBuf::from("/srv/app/dist/assets")
        );
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let root = Path::new("/srv/app");
        assert_eq!(
            resolve_app_path(root, "/etc/config"),
            PathBuf::from("/etc/config")
        );
    }

    #[test]
    fn test_layout_from_absolute_root() {
        let paths = AppPaths::from_root("/srv/app");
        assert_eq!(paths.root, PathBuf::from("/srv/app"));
        assert_eq!(paths.assets, PathBuf::from("/srv/app/assets"));
        assert_eq!(paths.dist_assets, PathBuf::from("/srv/app/dist/assets"));
        assert_eq!(paths.dist_client, PathBuf::from("/srv/app/dist/client"));
        assert_eq!(
            paths.handlers,
            PathBuf::from("/srv/app/src/server/handlers")
        );
        assert_eq!(paths.shared_src, PathBuf::from("/srv/app/src/shared"));
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let paths = AppPaths::from_root("some/app");
        assert!(paths.root.is_absolute());
        assert!(paths.root.ends_with("some/app"));
    }
}
