//! Markdown discovery by filesystem walking.
//!
//! The scanner only finds files; nothing is read or parsed at this stage.

use std::fs;
use std::path::{Path, PathBuf};

use mdkt_cache::RootSet;

/// A markdown file found under one of the roots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Canonical path of the file.
    pub path: PathBuf,
    /// Path relative to its root, `/`-separated (e.g. `docs/setup.md`).
    pub relative_path: String,
}

/// Walks every root collecting `*.md` files.
///
/// Hidden files and directories (leading `.`) are skipped, as is anything
/// matching one of the exclude globs. Globs are matched against the
/// root-relative path.
pub struct Scanner {
    exclude: Vec<glob::Pattern>,
}

impl Scanner {
    /// Create a scanner with the given exclude patterns.
    ///
    /// Invalid patterns are logged and ignored.
    #[must_use]
    pub fn new(exclude: &[String]) -> Self {
        let exclude = exclude
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();
        Self { exclude }
    }

    /// Scan all roots and return discovered files.
    ///
    /// Files are returned sorted by canonical path; a file reachable from
    /// several roots (or through a symlink) is listed once.
    #[must_use]
    pub fn scan(&self, roots: &RootSet) -> Vec<SourceFile> {
        let mut files = Vec::new();
        for root in roots.roots() {
            self.scan_directory(roots, root, "", &mut files);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        files
    }

    fn scan_directory(&self, roots: &RootSet, dir: &Path, prefix: &str, files: &mut Vec<SourceFile>) {
        let Ok(entries) = fs::read_dir(dir) else {
            tracing::debug!(dir = %dir.display(), "Cannot read directory");
            return;
        };

        // Sorted for deterministic traversal
        let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            if self.is_excluded(&relative) {
                tracing::debug!(path = %relative, "Excluded");
                continue;
            }

            let path = entry.path();
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            if is_dir {
                self.scan_directory(roots, &path, &relative, files);
            } else if path.extension().is_some_and(|e| e == "md") {
                // Symlinks leaving the roots are skipped like any other escape.
                let Some(canonical) = roots.resolve_canonical(&path) else {
                    tracing::debug!(path = %path.display(), "Skipping file outside roots");
                    continue;
                };
                files.push(SourceFile {
                    path: canonical,
                    relative_path: relative,
                });
            }
        }
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.exclude.iter().any(|pattern| pattern.matches(relative))
    }
}
