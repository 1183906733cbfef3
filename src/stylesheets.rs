//! Built-stylesheet inlining.
//!
//! Collects the compiled `.css` files from the built asset directory and wraps
//! each in a `<style>` tag so server-rendered pages can ship their styles
//! inline instead of referencing the bundle by URL.

use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Inline every `.css` file directly inside `dir` into `<style>` tags.
///
/// Returns `Ok(None)` when the directory does not exist, which callers treat
/// as "no build output yet". An existing but empty directory yields
/// `Ok(Some(""))`. Files are taken in directory enumeration order; only
/// regular files whose final extension is `css` participate, so source maps
/// (`*.css.map`) and nested directories are skipped.
///
/// # Errors
///
/// Propagates I/O errors from reading the directory or any matching file.
pub fn inline_style_sheets(dir: &Path) -> io::Result<Option<String>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no built assets directory, skipping stylesheet inlining");
        return Ok(None);
    }
    let mut styles = String::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("css") {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        debug!(file = %path.display(), bytes = content.len(), "inlining stylesheet");
        styles.push_str("<style type=\"text/css\">");
        styles.push_str(&content);
        styles.push_str("</style>");
    }
    Ok(Some(styles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_absent_directory_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("dist").join("assets");
        assert_eq!(inline_style_sheets(&missing).unwrap(), None);
    }

    #[test]
    fn test_empty_directory_is_empty_string() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            inline_style_sheets(tmp.path()).unwrap(),
            Some(String::new())
        );
    }

    #[test]
    fn test_wraps_each_css_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("app.css"), "body{margin:0}").unwrap();
        let out = inline_style_sheets(tmp.path()).unwrap().unwrap();
        assert_eq!(out, "<style type=\"text/css\">body{margin:0}</style>");
    }

    #[test]
    fn test_skips_maps_and_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("app.css"), "body{margin:0}").unwrap();
        fs::write(tmp.path().join("app.css.map"), "{\"version\":3}").unwrap();
        fs::write(tmp.path().join("bundle.js"), "console.log(1)").unwrap();
        fs::create_dir(tmp.path().join("fonts.css")).unwrap();
        let out = inline_style_sheets(tmp.path()).unwrap().unwrap();
        assert_eq!(out, "<style type=\"text/css\">body{margin:0}</style>");
    }

    #[test]
    fn test_concatenates_multiple_sheets() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.css"), "a{}").unwrap();
        fs::write(tmp.path().join("b.css"), "b{}").unwrap();
        let out = inline_style_sheets(tmp.path()).unwrap().unwrap();
        assert!(out.contains("<style type=\"text/css\">a{}</style>"));
        assert!(out.contains("<style type=\"text/css\">b{}</style>"));
        assert_eq!(out.matches("<style").count(), 2);
    }
}
