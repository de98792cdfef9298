//! Document cache for markdown conversion.
//!
//! [`DocumentCache`] maps canonical file paths to parsed trees. Each file is
//! read and parsed at most once per cache; later lookups return the same
//! shared [`Arc<Node>`]. Lookups are confined to a [`RootSet`]: files outside
//! every root are never read.
//!
//! # Example
//!
//! ```no_run
//! use mdkt_cache::{DocumentCache, RootSet};
//! use mdkt_renderer::CommonMarkParser;
//!
//! let roots = RootSet::new(["docs"]).unwrap();
//! let cache = DocumentCache::new(CommonMarkParser::default(), roots);
//! if let Some(guide) = cache.get_relative("guide.md") {
//!     println!("{} has {} top-level nodes", guide.relative_path, guide.node.children.len());
//! }
//! ```

mod resolver;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mdkt_renderer::{DocumentResolver, MarkdownParser, Node, ParseError, ResolvedDocument};

pub use resolver::{RootSet, is_contained};

/// Error loading a document through the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A configured root cannot be used.
    #[error("invalid root {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document is not inside any configured root.
    #[error("{} is outside all configured roots", .path.display())]
    OutsideRoots { path: PathBuf },
    /// The document cannot be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The document cannot be parsed.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Canonical path to parsed tree, parsing each file at most once.
pub struct DocumentCache {
    parser: Box<dyn MarkdownParser>,
    roots: RootSet,
    documents: Mutex<HashMap<PathBuf, Arc<Node>>>,
}

impl DocumentCache {
    /// Create an empty cache confined to `roots`.
    pub fn new(parser: impl MarkdownParser + 'static, roots: RootSet) -> Self {
        Self {
            parser: Box::new(parser),
            roots,
            documents: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Number of parsed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the tree for `path`, parsing it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::OutsideRoots`] if the canonical path is not
    /// inside a root, [`CacheError::Read`] if it cannot be canonicalized or
    /// read, and [`CacheError::Parse`] if the parser rejects it.
    pub fn get(&self, path: &Path) -> Result<Arc<Node>, CacheError> {
        let canonical = path.canonicalize().map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if !self.roots.is_contained(&canonical) {
            return Err(CacheError::OutsideRoots { path: canonical });
        }
        self.load(&canonical)
    }

    fn documents(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Node>>> {
        // Entries are only inserted fully built, so a poisoned map is still consistent.
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a cached tree or read and parse it.
    ///
    /// The lock is held while parsing so a path is never parsed twice.
    fn load(&self, canonical: &Path) -> Result<Arc<Node>, CacheError> {
        let mut documents = self.documents();
        if let Some(node) = documents.get(canonical) {
            tracing::debug!(path = %canonical.display(), "Document cache hit");
            return Ok(Arc::clone(node));
        }

        tracing::debug!(path = %canonical.display(), "Document cache miss, parsing");
        let text = std::fs::read_to_string(canonical).map_err(|source| CacheError::Read {
            path: canonical.to_path_buf(),
            source,
        })?;
        let node = Arc::new(self.parser.parse(&text).map_err(|source| CacheError::Parse {
            path: canonical.to_path_buf(),
            source,
        })?);
        documents.insert(canonical.to_path_buf(), Arc::clone(&node));
        Ok(node)
    }

    /// Resolve a root-relative path and return its document.
    ///
    /// Every failure (missing, not a file, outside the roots, unreadable,
    /// unparsable) yields `None`; the cause is only logged at debug level.
    #[must_use]
    pub fn get_relative(&self, relative_path: &str) -> Option<ResolvedDocument> {
        let Some(canonical) = self.roots.resolve_canonical(Path::new(relative_path)) else {
            tracing::debug!(path = relative_path, "Reference not found within roots");
            return None;
        };
        let relative = self.roots.relative_path(&canonical)?;
        match self.load(&canonical) {
            Ok(node) => Some(ResolvedDocument {
                path: canonical,
                relative_path: relative,
                node,
            }),
            Err(e) => {
                tracing::debug!(path = relative_path, error = %e, "Reference cannot be loaded");
                None
            }
        }
    }
}

impl DocumentResolver for DocumentCache {
    fn get_relative(&self, relative_path: &str) -> Option<ResolvedDocument> {
        DocumentCache::get_relative(self, relative_path)
    }
}
