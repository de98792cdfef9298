//! Root-contained path resolution.
//!
//! Every path handed out by [`RootSet`] is canonical (symlinks and `..`
//! resolved) and lies inside at least one configured root. Paths that escape
//! all roots are reported exactly like missing files.

use std::path::{Component, Path, PathBuf};

use crate::CacheError;

/// Ordered set of canonical root directories.
#[derive(Clone, Debug)]
pub struct RootSet {
    roots: Vec<PathBuf>,
}

impl RootSet {
    /// Canonicalize `roots`, keeping their order and dropping duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Root`] if a root cannot be canonicalized or is
    /// not a directory.
    pub fn new<I, P>(roots: I) -> Result<Self, CacheError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut canonical_roots: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let canonical = root.canonicalize().map_err(|source| CacheError::Root {
                path: root.to_path_buf(),
                source,
            })?;
            if !canonical.is_dir() {
                return Err(CacheError::Root {
                    path: root.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotADirectory,
                        "root is not a directory",
                    ),
                });
            }
            if !canonical_roots.contains(&canonical) {
                canonical_roots.push(canonical);
            }
        }
        Ok(Self {
            roots: canonical_roots,
        })
    }

    /// Canonical roots in configured order.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Resolve `path` to a canonical regular file inside the roots.
    ///
    /// Relative paths are tried against each root in order; the first existing
    /// regular file that stays inside that root wins. Absolute paths are
    /// canonicalized directly and must lie inside some root.
    ///
    /// Missing files, directories, root escapes and I/O errors all yield
    /// `None`.
    #[must_use]
    pub fn resolve_canonical(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            let canonical = canonical_file(path)?;
            return self.is_contained(&canonical).then_some(canonical);
        }

        self.roots.iter().find_map(|root| {
            let canonical = canonical_file(&root.join(path))?;
            canonical.starts_with(root).then_some(canonical)
        })
    }

    /// Whether `canonical` lies inside at least one root.
    #[must_use]
    pub fn is_contained(&self, canonical: &Path) -> bool {
        is_contained(canonical, &self.roots)
    }

    /// Root-relative, `/`-separated form of a contained canonical path.
    ///
    /// Uses the first root containing the path.
    #[must_use]
    pub fn relative_path(&self, canonical: &Path) -> Option<String> {
        let root = self.roots.iter().find(|root| canonical.starts_with(root))?;
        let relative = canonical.strip_prefix(root).ok()?;
        let segments: Vec<&str> = relative
            .components()
            .map(|component| match component {
                Component::Normal(segment) => segment.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        Some(segments.join("/"))
    }
}

/// Containment check on canonical paths.
///
/// Compares whole components, so `/docs-evil` is not inside `/docs`.
#[must_use]
pub fn is_contained(canonical: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| canonical.starts_with(root))
}

/// Canonicalize `path`, accepting only regular files.
fn canonical_file(path: &Path) -> Option<PathBuf> {
    match path.canonicalize() {
        Ok(canonical) if canonical.is_file() => Some(canonical),
        Ok(canonical) => {
            tracing::debug!(path = %canonical.display(), "Not a regular file");
            None
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot canonicalize path");
            None
        }
    }
}
