//! Filesystem sandbox.
//!
//! Every path a model hands us is resolved against a fixed root. The result
//! is normalized (`.`/`..` removed), its longest existing ancestor is
//! canonicalized so symlinks are followed, and only then compared to the
//! root segment by segment. `/data/proj2` is therefore never mistaken for a
//! child of `/data/proj`.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::tool::ToolError;

/// Errors raised while establishing the jail itself.
#[derive(Debug, thiserror::Error)]
pub enum JailError {
    #[error("jail root '{path}' is not accessible: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("jail root '{0}' is not a directory")]
    NotADirectory(PathBuf),
}

/// Resolves caller-supplied relative paths inside a fixed root directory.
///
/// The root is canonicalized once at construction and never changes, so a
/// `PathJail` can be cloned freely and shared across tasks without locking.
#[derive(Debug, Clone)]
pub struct PathJail {
    root: PathBuf,
}

impl PathJail {
    /// Create a jail rooted at an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, JailError> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root).map_err(|source| JailError::Inaccessible {
            path: root.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(JailError::NotADirectory(canonical));
        }
        Ok(Self { root: canonical })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `requested` against the root.
    ///
    /// Returns the absolute path to operate on, or
    /// [`ToolError::SandboxViolation`] when it would land outside the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        let joined = normalize_lexically(&self.root.join(requested));
        let resolved =
            canonicalize_existing_prefix(&joined).map_err(|e| ToolError::io(requested, e))?;

        if !self.contains(&resolved) {
            debug!(requested, resolved = %resolved.display(), "path escapes jail");
            return Err(ToolError::SandboxViolation {
                requested: requested.to_string(),
                resolved: resolved.display().to_string(),
            });
        }

        debug!(requested, resolved = %resolved.display(), "resolved jailed path");
        Ok(resolved)
    }

    /// Whether an absolute, already canonical path is the root or below it.
    ///
    /// `Path::starts_with` compares whole components, which gives the
    /// separator boundary for free.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }

    /// Render a resolved path relative to the root for messages back to the model.
    pub fn display_relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Remove `.` and `..` without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Symlink hops followed by hand before giving up, matching the usual `ELOOP` limit.
const MAX_SYMLINK_HOPS: usize = 40;

/// Canonicalize the longest existing ancestor of `path` (resolving symlinks)
/// and re-attach the components that do not exist yet.
///
/// Files about to be created have no canonical form of their own, but the
/// directory they would be created in does. A dangling symlink also fails
/// `canonicalize` with `NotFound`; it is followed manually so the path that
/// a write would actually reach is what gets checked.
fn canonicalize_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut path = path.to_path_buf();
    'hops: for _ in 0..MAX_SYMLINK_HOPS {
        let mut missing: Vec<OsString> = Vec::new();
        let mut current = path.clone();
        loop {
            match std::fs::canonicalize(&current) {
                Ok(mut base) => {
                    for part in missing.iter().rev() {
                        base.push(part);
                    }
                    return Ok(base);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if current.is_symlink() {
                        let target = std::fs::read_link(&current)?;
                        let mut next = match current.parent() {
                            Some(parent) => parent.join(target),
                            None => target,
                        };
                        for part in missing.iter().rev() {
                            next.push(part);
                        }
                        debug!(link = %current.display(), target = %next.display(), "following dangling symlink");
                        path = normalize_lexically(&next);
                        continue 'hops;
                    }
                    let name = current
                        .file_name()
                        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no existing ancestor"))?
                        .to_os_string();
                    missing.push(name);
                    current = current
                        .parent()
                        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no existing ancestor"))?
                        .to_path_buf();
                }
                Err(e) => return Err(e),
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::Other,
        "too many levels of symbolic links",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jail() -> (tempfile::TempDir, PathJail) {
        let dir = tempfile::tempdir().unwrap();
        let jail = PathJail::new(dir.path()).unwrap();
        (dir, jail)
    }

    #[test]
    fn test_resolves_inside_root() {
        let (_dir, jail) = jail();
        let resolved = jail.resolve("a/b.txt").unwrap();
        assert_eq!(resolved, jail.root().join("a").join("b.txt"));
    }

    #[test]
    fn test_dot_is_root() {
        let (_dir, jail) = jail();
        let resolved = jail.resolve(".").unwrap();
        assert!(jail.is_root(&resolved));
        assert_eq!(jail.display_relative(&resolved), ".");
    }

    #[test]
    fn test_parent_traversal_rejected_at_any_depth() {
        let (dir, _) = jail();
        let deep = dir.path().join("x/y/z");
        std::fs::create_dir_all(&deep).unwrap();
        for root in [dir.path().to_path_buf(), deep] {
            let jail = PathJail::new(&root).unwrap();
            let err = jail.resolve("../../etc/passwd").unwrap_err();
            assert!(matches!(err, ToolError::SandboxViolation { .. }));
        }
    }

    #[test]
    fn test_inner_traversal_that_stays_inside_is_allowed() {
        let (_dir, jail) = jail();
        let resolved = jail.resolve("a/../b.txt").unwrap();
        assert_eq!(resolved, jail.root().join("b.txt"));
    }

    #[test]
    fn test_absolute_path_outside_rejected() {
        let (_dir, jail) = jail();
        assert!(matches!(
            jail.resolve("/etc/passwd"),
            Err(ToolError::SandboxViolation { .. })
        ));
    }

    #[test]
    fn test_sibling_with_shared_prefix_rejected() {
        let parent = tempfile::tempdir().unwrap();
        let proj = parent.path().join("proj");
        let proj2 = parent.path().join("proj2");
        std::fs::create_dir_all(&proj).unwrap();
        std::fs::create_dir_all(&proj2).unwrap();
        std::fs::write(proj2.join("secret"), "s").unwrap();

        let jail = PathJail::new(&proj).unwrap();
        let err = jail.resolve("../proj2/secret").unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let (_dir, jail) = jail();
        std::os::unix::fs::symlink(outside.path(), jail.root().join("link")).unwrap();

        assert!(matches!(
            jail.resolve("link/new-file.txt"),
            Err(ToolError::SandboxViolation { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_escape_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let (_dir, jail) = jail();
        let target = outside.path().join("pwned.txt");
        std::os::unix::fs::symlink(&target, jail.root().join("link")).unwrap();

        assert!(matches!(
            jail.resolve("link"),
            Err(ToolError::SandboxViolation { .. })
        ));
        assert!(matches!(
            jail.resolve("link/below.txt"),
            Err(ToolError::SandboxViolation { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_dangling_symlink_escape_rejected() {
        let (_dir, jail) = jail();
        std::os::unix::fs::symlink("../outside.txt", jail.root().join("link")).unwrap();

        assert!(matches!(
            jail.resolve("link"),
            Err(ToolError::SandboxViolation { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_inside_resolves_to_target() {
        let (_dir, jail) = jail();
        std::fs::create_dir(jail.root().join("sub")).unwrap();
        std::os::unix::fs::symlink("sub/later.txt", jail.root().join("link")).unwrap();

        let resolved = jail.resolve("link").unwrap();
        assert_eq!(resolved, jail.root().join("sub").join("later.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_an_error() {
        let (_dir, jail) = jail();
        std::os::unix::fs::symlink("b", jail.root().join("a")).unwrap();
        std::os::unix::fs::symlink("a", jail.root().join("b")).unwrap();

        assert!(jail.resolve("a").is_err());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PathJail::new(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, JailError::Inaccessible { .. }));
    }

    #[test]
    fn test_file_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(PathJail::new(&file), Err(JailError::NotADirectory(_))));
    }

    #[test]
    fn test_normalize_lexically_stops_at_filesystem_root() {
        assert_eq!(normalize_lexically(Path::new("/a/../../..")), PathBuf::from("/"));
        assert_eq!(normalize_lexically(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
