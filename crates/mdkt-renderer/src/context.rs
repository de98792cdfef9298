//! Per-file rendering state.
//!
//! A [`RenderContext`] is created for every output file and threaded through
//! all handlers. It owns the accumulated imports and diagnostics, and gives
//! handlers access to other documents through a [`DocumentResolver`].

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use crate::node::Node;
use crate::util::slugify;

/// A cross-referenced document found by a [`DocumentResolver`].
#[derive(Clone, Debug)]
pub struct ResolvedDocument {
    /// Canonical filesystem path; unique per document.
    pub path: PathBuf,
    /// Path relative to the root it was found under, `/`-separated.
    pub relative_path: String,
    /// Shared parsed tree.
    pub node: Arc<Node>,
}

/// Looks up other markdown documents by root-relative path.
///
/// Implementations return `None` for anything that cannot be used as a
/// reference: missing files, files outside the configured roots, and files
/// that fail to parse are indistinguishable to the caller.
pub trait DocumentResolver {
    fn get_relative(&self, relative_path: &str) -> Option<ResolvedDocument>;
}

/// Resolver that never finds anything.
///
/// Used when rendering a standalone document without cross-references.
pub struct NullResolver;

impl DocumentResolver for NullResolver {
    fn get_relative(&self, _relative_path: &str) -> Option<ResolvedDocument> {
        None
    }
}

/// Outcome of resolving a link or embed destination.
#[derive(Debug)]
pub enum Reference {
    /// Not a markdown reference (external URL, anchor, asset).
    External,
    /// A markdown document that was found and parsed.
    Resolved {
        document: ResolvedDocument,
        /// Fragment including the leading `#`, if any.
        fragment: Option<String>,
    },
    /// A markdown reference that could not be resolved.
    Unresolved,
}

/// Mutable state for rendering one output file.
pub struct RenderContext<'a> {
    package: String,
    function_name: String,
    group: String,
    imports: BTreeSet<String>,
    resolver: &'a dyn DocumentResolver,
    default_root: Option<String>,
    markdown_artifact: bool,
    /// Root-relative path of the document currently being rendered.
    source_path: String,
    /// Canonical paths of the documents being rendered, outermost first.
    include_stack: Vec<PathBuf>,
    heading_ids: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl<'a> RenderContext<'a> {
    /// Create a context for rendering `function_name` into `package`.
    pub fn new(
        package: impl Into<String>,
        function_name: impl Into<String>,
        resolver: &'a dyn DocumentResolver,
    ) -> Self {
        Self {
            package: package.into(),
            function_name: function_name.into(),
            group: String::new(),
            imports: BTreeSet::new(),
            resolver,
            default_root: None,
            markdown_artifact: false,
            source_path: String::new(),
            include_stack: Vec::new(),
            heading_ids: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Project group used to resolve `.`-prefixed names.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Seed the import set.
    #[must_use]
    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for import in imports {
            self.add_import(import);
        }
        self
    }

    /// Layout composable used when the document's front matter names none.
    #[must_use]
    pub fn with_default_root(mut self, root: Option<String>) -> Self {
        self.default_root = root.filter(|r| !r.trim().is_empty());
        self
    }

    /// Whether the markdown runtime artifact is on the classpath.
    #[must_use]
    pub fn with_markdown_artifact(mut self, enabled: bool) -> Self {
        self.markdown_artifact = enabled;
        self
    }

    /// Identify the document being rendered.
    ///
    /// `canonical` seeds the include stack so a document embedding itself is
    /// detected as a cycle.
    #[must_use]
    pub fn with_source(mut self, relative_path: impl Into<String>, canonical: Option<PathBuf>) -> Self {
        self.source_path = relative_path.into();
        self.include_stack.extend(canonical);
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn default_root(&self) -> Option<&str> {
        self.default_root.as_deref()
    }

    pub fn markdown_artifact(&self) -> bool {
        self.markdown_artifact
    }

    /// Root-relative path of the document currently being rendered.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn resolver(&self) -> &'a dyn DocumentResolver {
        self.resolver
    }

    /// Add an import statement target. Blank entries are ignored.
    pub fn add_import(&mut self, import: impl Into<String>) {
        let import = import.into();
        let trimmed = import.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.len() == import.len() {
            self.imports.insert(import);
        } else {
            self.imports.insert(trimmed.to_owned());
        }
    }

    /// Accumulated imports in sorted order.
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(source = %self.source_path, "{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Unique id for a heading with the given text (`faq`, `faq-1`, ...).
    pub fn heading_id(&mut self, text: &str) -> String {
        let base_id = slugify(text);
        let count = self.heading_ids.entry(base_id.clone()).or_default();
        let id = match *count {
            0 => base_id,
            n => format!("{base_id}-{n}"),
        };
        *count += 1;
        id
    }

    /// Resolve a link or embed destination relative to the current document.
    ///
    /// Destinations starting with `/` are root-relative. Failed markdown
    /// references are recorded as warnings.
    pub fn resolve_reference(&mut self, destination: &str) -> Reference {
        let Some((path, fragment)) = markdown_reference(destination) else {
            return Reference::External;
        };

        let relative = match path.strip_prefix('/') {
            Some(absolute) => absolute.to_owned(),
            None => match self.source_path.rsplit_once('/') {
                Some((dir, _)) => format!("{dir}/{path}"),
                None => path.to_owned(),
            },
        };

        match self.resolver.get_relative(&relative) {
            Some(document) => Reference::Resolved {
                document,
                fragment: fragment.map(str::to_owned),
            },
            None => {
                self.warn(format!(
                    "Unresolved markdown reference '{destination}' in {}",
                    self.source_path
                ));
                Reference::Unresolved
            }
        }
    }

    /// Whether `path` is already being rendered further up the include chain.
    pub fn is_rendering(&self, path: &std::path::Path) -> bool {
        self.include_stack.iter().any(|p| p == path)
    }

    /// Enter an embedded document; returns the previous source path.
    pub(crate) fn enter_document(&mut self, document: &ResolvedDocument) -> String {
        self.include_stack.push(document.path.clone());
        std::mem::replace(&mut self.source_path, document.relative_path.clone())
    }

    /// Leave an embedded document entered with [`enter_document`](Self::enter_document).
    pub(crate) fn leave_document(&mut self, previous_source: String) {
        self.include_stack.pop();
        self.source_path = previous_source;
    }
}

/// Split a destination into markdown path and fragment.
///
/// Returns `None` for external links, bare fragments and non-markdown targets.
#[allow(clippy::case_sensitive_file_extension_comparisons)]
pub(crate) fn markdown_reference(destination: &str) -> Option<(&str, Option<&str>)> {
    if destination.starts_with('#') || destination.starts_with("//") || destination.contains("://")
    {
        return None;
    }
    if let Some((scheme, _)) = destination.split_once(':')
        && !scheme.contains('/')
    {
        // mailto:, tel:, data: ...
        return None;
    }

    let (path, fragment) = match destination.find('#') {
        Some(pos) => (&destination[..pos], Some(&destination[pos..])),
        None => (destination, None),
    };
    path.ends_with(".md").then_some((path, fragment))
}
