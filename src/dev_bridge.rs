//! Development asset bridge.
//!
//! Outside production the server answers asset requests straight from the
//! source tree, so the client build step is not needed during development.
//! The bridge is a [`Middleware`]: it intercepts GET requests it recognizes
//! and lets everything else fall through to mounts and handlers.
//!
//! Three families of paths are served:
//!
//! - `/` and `/index.html`: the root `index.html` rendered as a template,
//!   with the built stylesheets inlined under the `styles` variable
//! - `/src/...`: files from the application source tree
//! - `/@root/...`, `/@client/...`, `/@server/...`, `/@shared/...`: files
//!   resolved through the module aliases
//!
//! In test mode the bridge serves identically but logs at debug level only.

use crate::alias::AliasMap;
use crate::middleware::{Intercept, Middleware};
use crate::paths::AppPaths;
use crate::server::ParsedRequest;
use crate::static_assets::StaticFiles;
use crate::stylesheets::inline_style_sheets;
use std::io;
use tracing::{debug, info, warn};

pub struct DevAssetBridge {
    paths: AppPaths,
    aliases: AliasMap,
    quiet: bool,
}

impl DevAssetBridge {
    /// Build a bridge over the application tree. `quiet` drops per-request
    /// logging to debug level, used in test mode.
    pub fn new(paths: AppPaths, aliases: AliasMap, quiet: bool) -> Self {
        Self {
            paths,
            aliases,
            quiet,
        }
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    fn log_served(&self, path: &str, content_type: &str) {
        if self.quiet {
            debug!(path, content_type, "dev bridge served");
        } else {
            info!(path, content_type, "dev bridge served");
        }
    }

    /// Render the root `index.html` with the built stylesheets inlined.
    fn render_index(&self) -> io::Result<(Vec<u8>, &'static str)> {
        let styles = match inline_style_sheets(&self.paths.dist_assets) {
            Ok(styles) => styles.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "stylesheet inlining failed, rendering without styles");
                String::new()
            }
        };
        let ctx = serde_json::json!({ "styles": styles });
        StaticFiles::new(&self.paths.root).load("index.html", Some(&ctx))
    }

    fn serve(&self, path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        if path == "/" || path == "/index.html" {
            return self.render_index();
        }
        if let Some(rel) = path.strip_prefix("/src/") {
            return StaticFiles::new(self.paths.root.join("src")).load(rel, None);
        }
        if let Some(reference) = path.strip_prefix('/') {
            if reference.starts_with('@') {
                let (alias, rest) = reference
                    .split_once('/')
                    .map_or((reference, ""), |(a, r)| (a, r));
                if let Some(target) = self.aliases.target(alias) {
                    return StaticFiles::new(target).load(rest, None);
                }
            }
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "not a bridge path"))
    }
}

impl Middleware for DevAssetBridge {
    fn before(&self, req: &ParsedRequest) -> Option<Intercept> {
        if req.method != "GET" {
            return None;
        }
        match self.serve(&req.path) {
            Ok((body, content_type)) => {
                self.log_served(&req.path, content_type);
                Some(Intercept::new(200, content_type, body))
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %req.path, error = %e, "dev bridge failed to serve");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::ids::RequestId;
    use std::collections::HashMap;
    use std::fs;

    fn request(method: &str, path: &str) -> ParsedRequest {
        ParsedRequest {
            request_id: RequestId::new(),
            method: method.to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query_params: HashMap::new(),
            body: None,
        }
    }

    fn bridge(root: &std::path::Path) -> DevAssetBridge {
        let paths = AppPaths::from_root(root);
        let aliases = AliasMap::new(&paths);
        DevAssetBridge::new(paths, aliases, false)
    }

    #[test]
    fn test_index_renders_with_inlined_styles() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("index.html"),
            "<html><head>{{ styles }}</head></html>",
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("dist/assets")).unwrap();
        fs::write(tmp.path().join("dist/assets/app.css"), "body{margin:0}").unwrap();

        let hit = bridge(tmp.path()).before(&request("GET", "/")).unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.content_type, "text/html");
        let html = String::from_utf8(hit.body).unwrap();
        assert!(html.contains("<style type=\"text/css\">body{margin:0}</style>"));
    }

    #[test]
    fn test_index_renders_without_built_assets() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("index.html"),
            "<html>{{ styles }}<body></body></html>",
        )
        .unwrap();
        let hit = bridge(tmp.path()).before(&request("GET", "/")).unwrap();
        let html = String::from_utf8(hit.body).unwrap();
        assert!(!html.contains("<style"));
    }

    #[test]
    fn test_serves_source_tree() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src/client")).unwrap();
        fs::write(tmp.path().join("src/client/app.js"), "export {}").unwrap();
        let hit = bridge(tmp.path())
            .before(&request("GET", "/src/client/app.js"))
            .unwrap();
        assert_eq!(hit.content_type, "application/javascript");
        assert_eq!(hit.body, b"export {}");
    }

    #[test]
    fn test_serves_aliased_path() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src/shared")).unwrap();
        fs::write(tmp.path().join("src/shared/types.js"), "export {}").unwrap();
        let hit = bridge(tmp.path())
            .before(&request("GET", "/@shared/types.js"))
            .unwrap();
        assert_eq!(hit.body, b"export {}");
    }

    #[test]
    fn test_traversal_through_alias_falls_through() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src/client")).unwrap();
        fs::write(tmp.path().join("secret.txt"), "nope").unwrap();
        assert!(bridge(tmp.path())
            .before(&request("GET", "/@client/../../secret.txt"))
            .is_none());
    }

    #[test]
    fn test_ignores_non_get_and_unknown_paths() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("index.html"), "<html></html>").unwrap();
        let b = bridge(tmp.path());
        assert!(b.before(&request("POST", "/")).is_none());
        assert!(b.before(&request("GET", "/api/users")).is_none());
    }
}
