//! Static asset serving.
//!
//! [`StaticFiles`] maps URL paths onto a base directory with a component
//! filter that rejects parent-directory escapes, and optionally renders
//! `.html` files as templates. [`StaticMount`] binds a `StaticFiles` root to a
//! URL prefix inside the request pipeline: a miss under a mount is not an
//! error, the request falls through to the next pipeline step.

use minijinja::Environment;
use serde_json::Value as JsonValue;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URL path to a file under the base directory. Any component that
    /// is not a plain name (`..`, a root, a Windows prefix) rejects the whole
    /// path.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" | "map" => "application/json",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "woff" => "font/woff",
            "woff2" => "font/woff2",
            "ttf" => "font/ttf",
            "wasm" => "application/wasm",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }

    /// Load a file by URL path. `.html` files are rendered as templates when
    /// a context is supplied; everything else is returned verbatim.
    ///
    /// # Errors
    ///
    /// `NotFound` for rejected paths and missing or non-regular files, and
    /// any underlying read or template error otherwise.
    pub fn load(
        &self,
        url_path: &str,
        ctx: Option<&JsonValue>,
    ) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.exists() || !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        if path.extension().and_then(|s| s.to_str()) == Some("html") {
            if let Some(ctx_val) = ctx {
                let source = fs::read_to_string(&path)?;
                let mut env = Environment::new();
                env.add_template("tpl", &source)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                let tmpl = env
                    .get_template("tpl")
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                let rendered = tmpl
                    .render(ctx_val)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                return Ok((rendered.into_bytes(), Self::content_type(&path)));
            }
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

/// A static file root bound to a URL prefix in the request pipeline.
///
/// Mounts are consulted in registration order; the first hit wins. `serve`
/// returns `Ok(None)` for anything that is not a hit so the pipeline can move
/// on, covering prefix mismatches, rejected paths and missing files alike.
pub struct StaticMount {
    url_prefix: String,
    files: StaticFiles,
    auto_index: bool,
}

impl StaticMount {
    /// Mount `base` under `url_prefix` with auto-index enabled: a request for
    /// the mount root or a `/`-terminated path serves its `index.html`.
    pub fn new<P: Into<PathBuf>>(url_prefix: &str, base: P) -> Self {
        let mut url_prefix = url_prefix.to_string();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }
        Self {
            url_prefix,
            files: StaticFiles::new(base),
            auto_index: true,
        }
    }

    /// Disable index resolution. Directory requests then fall through, which
    /// lets a bundle mounted at `/` coexist with a server-rendered index.
    pub fn without_auto_index(mut self) -> Self {
        self.auto_index = false;
        self
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn auto_index(&self) -> bool {
        self.auto_index
    }

    /// Relative path under this mount, if the request path is covered by it.
    fn relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.url_prefix == "/" {
            return Some(path.trim_start_matches('/'));
        }
        path.strip_prefix(&self.url_prefix)
            .or_else(|| (format!("{path}/") == self.url_prefix).then_some(""))
    }

    /// Serve a request path from this mount, or `Ok(None)` to fall through.
    ///
    /// # Errors
    ///
    /// Only real I/O failures surface; misses of every kind map to `None`.
    pub fn serve(&self, path: &str) -> io::Result<Option<(Vec<u8>, &'static str)>> {
        let rel = match self.relative(path) {
            Some(rel) => rel,
            None => return Ok(None),
        };
        let rel = if rel.is_empty() || rel.ends_with('/') {
            if !self.auto_index {
                return Ok(None);
            }
            format!("{rel}index.html")
        } else {
            rel.to_string()
        };
        match self.files.load(&rel, None) {
            Ok(hit) => {
                debug!(prefix = %self.url_prefix, file = %rel, "static mount hit");
                Ok(Some(hit))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
