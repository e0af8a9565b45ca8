//! Paths that are guaranteed to stay inside a root directory.
//!
//! Every filesystem location the prefetcher touches, inside the cloned
//! repository or inside the output directory, is represented as a
//! [`RootedPath`]. Joining a subpath re-checks containment, so path
//! traversal through `..` components or symlinks planted in the
//! repository surfaces as [`Error::PathOutsideRoot`] instead of an
//! arbitrary write.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// An absolute path together with the root directory it must stay under.
///
/// The containment invariant is established at construction and preserved
/// by every operation: `path` always starts with `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootedPath {
    root: PathBuf,
    path: PathBuf,
}

impl RootedPath {
    /// Create a rooted path anchored at `root`.
    ///
    /// Relative roots are interpreted against the current working
    /// directory. The root must be an existing directory; it is
    /// normalized up front, so later containment checks compare resolved
    /// paths rather than raw user input.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let raw = root.into();
        let absolute = if raw.is_absolute() {
            raw
        } else {
            let cwd = std::env::current_dir().map_err(|source| Error::Io {
                source,
                path: None,
                operation: "resolving current directory".to_string(),
            })?;
            cwd.join(raw)
        };
        let root = resolve(&absolute);
        if !root.is_dir() {
            let kind = if root.exists() {
                std::io::ErrorKind::NotADirectory
            } else {
                std::io::ErrorKind::NotFound
            };
            return Err(Error::io_with_path(
                std::io::Error::from(kind),
                root,
                "resolving root directory",
            ));
        }
        Ok(Self {
            path: root.clone(),
            root,
        })
    }

    /// The root directory this path is confined to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The full path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path relative to the root.
    #[must_use]
    pub fn subpath_from_root(&self) -> &Path {
        // The containment invariant makes strip_prefix infallible.
        self.path.strip_prefix(&self.root).unwrap_or(&self.path)
    }

    /// Join `subpath` and verify the result is still under the root.
    ///
    /// The joined path is normalized first: `.` and `..` components are
    /// eliminated and symlinks in existing components are followed, so a
    /// link pointing above the root cannot smuggle a write outside it.
    /// Absolute subpaths are allowed as long as they land inside the root.
    pub fn join_within_root(&self, subpath: impl AsRef<Path>) -> Result<Self> {
        let joined = self.path.join(subpath.as_ref());
        let resolved = resolve(&joined);
        if resolved.starts_with(&self.root) {
            Ok(Self {
                root: self.root.clone(),
                path: resolved,
            })
        } else {
            Err(Error::path_outside_root(resolved, self.root.clone()))
        }
    }
}

impl std::fmt::Display for RootedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl AsRef<Path> for RootedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Normalize an absolute path without requiring it to exist.
///
/// Components are processed left to right: `.` is dropped, `..` pops the
/// previous component, and components that exist on disk are canonicalized
/// so symlinks are resolved before the next component is applied.
/// Components that do not exist yet are kept as written.
fn resolve(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
            Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                if let Ok(canonical) = resolved.canonicalize() {
                    resolved = canonical;
                }
            }
        }
    }
    resolved
}
