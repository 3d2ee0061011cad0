//! Output directory preparation and static asset copying.

use crate::config::loader::normalize_path;
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error preparing the output directory or copying assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Static asset directory does not exist
    #[error("Static asset directory not found: {}", .0.display())]
    MissingStaticDir(PathBuf),
    /// Output directory is the project root or one of its ancestors
    #[error("Refusing to use {} as the output directory: it contains the project", .0.display())]
    UnsafeOutDir(PathBuf),
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
    /// Filesystem error
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError + '_ {
    move |source| AssetError::Io { path: path.to_path_buf(), source }
}

/// Make sure `out_dir` exists; with `clean`, delete its previous contents first.
///
/// Fails without touching anything when `out_dir` is `project_root` or an
/// ancestor of it.
pub fn prepare_out_dir(out_dir: &Path, project_root: &Path, clean: bool) -> Result<(), AssetError> {
    let out = normalize_path(out_dir);
    if normalize_path(project_root).starts_with(&out) {
        return Err(AssetError::UnsafeOutDir(out_dir.to_path_buf()));
    }
    if clean && out_dir.exists() {
        log::debug!("removing {}", out_dir.display());
        fs::remove_dir_all(out_dir).map_err(io_error(out_dir))?;
    }
    fs::create_dir_all(out_dir).map_err(io_error(out_dir))
}

/// Recursively copy every file under `static_dir` into `out_dir`.
///
/// Existing files are overwritten. Returns the number of files copied.
pub fn copy_static_assets(static_dir: &Path, out_dir: &Path) -> Result<usize, AssetError> {
    if !static_dir.is_dir() {
        return Err(AssetError::MissingStaticDir(static_dir.to_path_buf()));
    }

    let pattern = static_dir.join("**").join("*");
    let pattern = pattern.to_string_lossy();
    let entries =
        glob(&pattern).map_err(|e| AssetError::InvalidPattern(pattern.to_string(), e))?;

    let mut copied = 0;
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(AssetError::Io { path, source: e.into_error() });
            }
        };
        if !path.is_file() {
            continue;
        }
        // Paths yielded by the glob always live under `static_dir`.
        let Ok(relative) = path.strip_prefix(static_dir) else {
            continue;
        };
        let target = out_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        fs::copy(&path, &target).map_err(io_error(&target))?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap().write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_prepare_creates_out_dir() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("build");
        prepare_out_dir(&out, temp.path(), false).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn test_prepare_keeps_contents_without_clean() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("build");
        create_test_file(&out, "old.js", "x");
        prepare_out_dir(&out, temp.path(), false).unwrap();
        assert!(out.join("old.js").exists());
    }

    #[test]
    fn test_prepare_clean_removes_contents() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("build");
        create_test_file(&out, "stale/old.js", "x");
        prepare_out_dir(&out, temp.path(), true).unwrap();
        assert!(out.is_dir());
        assert!(!out.join("stale").exists());
    }

    #[test]
    fn test_prepare_refuses_project_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        let source = create_test_file(&root, "src/c/elements/all/sand.c", "x");

        for out in [root.clone(), root.join("."), root.join("src/.."), temp.path().to_path_buf()] {
            let result = prepare_out_dir(&out, &root, true);
            assert!(matches!(result, Err(AssetError::UnsafeOutDir(_))), "{}", out.display());
        }
        assert!(source.exists());
    }

    #[test]
    fn test_copy_static_assets_recursive() {
        let temp = TempDir::new().unwrap();
        let static_dir = temp.path().join("static");
        create_test_file(&static_dir, "index.html", "<html></html>");
        create_test_file(&static_dir, "shaders/elements.glsl", "void main() {}");
        create_test_file(&static_dir, "js/deep/app.js", "run()");
        let out = temp.path().join("build");

        let copied = copy_static_assets(&static_dir, &out).unwrap();
        assert_eq!(copied, 3);
        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "<html></html>");
        assert!(out.join("shaders/elements.glsl").is_file());
        assert!(out.join("js/deep/app.js").is_file());
    }

    #[test]
    fn test_copy_static_assets_missing_dir() {
        let temp = TempDir::new().unwrap();
        let result = copy_static_assets(&temp.path().join("nope"), temp.path());
        assert!(matches!(result, Err(AssetError::MissingStaticDir(_))));
    }
}
