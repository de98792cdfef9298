//! Kotlin source renderer.

use std::fmt::Write;

use crate::context::RenderContext;
use crate::handler::{HandlerTable, INDENT, RenderScope};
use crate::node::{FrontMatter, Node};
use crate::util::{escape_kotlin_string, resolve_package_shortcut};

/// Imports present in every generated page.
pub const BASE_IMPORTS: &[&str] = &[
    "androidx.compose.runtime.Composable",
    "com.varabyte.kobweb.core.Page",
];

/// Imports needed to provide the markdown runtime context.
pub const MARKDOWN_CONTEXT_IMPORTS: &[&str] = &[
    "androidx.compose.runtime.CompositionLocalProvider",
    "com.varabyte.kobwebx.markdown.LocalMarkdownContext",
    "com.varabyte.kobwebx.markdown.MarkdownContext",
];

/// Result of rendering one document.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Complete Kotlin source file.
    pub source: String,
    /// Warnings generated during rendering (e.g., unresolved references).
    pub warnings: Vec<String>,
}

/// Renders a document tree into a Kotlin `@Page` function.
///
/// The body is produced by dispatching every node through the
/// [`HandlerTable`]; the renderer itself only assembles the file around it:
///
/// ```kotlin
/// package <package>
///
/// import <sorted imports>
///
/// @Page
/// @Composable
/// fun <FunctionName>() {
///     <body>
/// }
/// ```
///
/// # Example
///
/// ```
/// use mdkt_renderer::{CommonMarkParser, KotlinRenderer, MarkdownParser, NullResolver, RenderContext};
///
/// let tree = CommonMarkParser::default().parse("Hello").unwrap();
/// let mut ctx = RenderContext::new("com.example.pages", "HelloPage", &NullResolver);
/// let result = KotlinRenderer::new().render(&tree, &mut ctx);
/// assert!(result.source.contains("fun HelloPage() {"));
/// ```
pub struct KotlinRenderer {
    handlers: HandlerTable,
}

impl KotlinRenderer {
    /// Create a renderer with the default Compose HTML handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HandlerTable::compose_html(),
        }
    }

    /// Create a renderer with a custom handler table.
    #[must_use]
    pub fn with_handlers(handlers: HandlerTable) -> Self {
        Self { handlers }
    }

    #[must_use]
    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Render `tree` into a complete Kotlin source file.
    pub fn render(&self, tree: &Node, ctx: &mut RenderContext<'_>) -> RenderResult {
        let front_matter = tree.front_matter().cloned().unwrap_or_default();
        let page_imports = front_matter.imports.iter().map(String::as_str);
        for import in BASE_IMPORTS.iter().copied().chain(page_imports) {
            ctx.add_import(import);
        }

        let wrappers = body_wrappers(&front_matter, ctx);
        let body = RenderScope::new(&self.handlers, ctx, wrappers.len() + 1).render(tree);

        let mut content = body;
        for (level, call) in wrappers.iter().enumerate().rev() {
            let indent = INDENT.repeat(level + 1);
            content = if content.is_empty() {
                format!("{indent}{call} {{}}\n")
            } else {
                format!("{indent}{call} {{\n{content}{indent}}}\n")
            };
        }

        let mut source = String::with_capacity(content.len() + 512);
        if !ctx.package().is_empty() {
            writeln!(source, "package {}", ctx.package()).unwrap();
            source.push('\n');
        }
        for import in ctx.imports() {
            writeln!(source, "import {import}").unwrap();
        }
        source.push('\n');
        source.push_str("@Page\n@Composable\n");
        writeln!(source, "fun {}() {{", ctx.function_name()).unwrap();
        source.push_str(&content);
        source.push_str("}\n");

        RenderResult {
            source,
            warnings: ctx.warnings().to_vec(),
        }
    }
}

impl Default for KotlinRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Calls wrapping the page body, outermost first.
///
/// The markdown context provider encloses the layout so the layout can
/// read front matter.
fn body_wrappers(front_matter: &FrontMatter, ctx: &mut RenderContext<'_>) -> Vec<String> {
    let mut wrappers = Vec::new();

    if ctx.markdown_artifact() {
        for import in MARKDOWN_CONTEXT_IMPORTS {
            ctx.add_import(*import);
        }
        wrappers.push(markdown_context_call(ctx.source_path(), front_matter));
    }

    let root = match front_matter.root.as_deref() {
        Some(root) => Some(root.trim().to_owned()),
        None => ctx.default_root().map(str::to_owned),
    };
    if let Some(root) = root.filter(|root| !root.is_empty()) {
        let qualified = resolve_package_shortcut(ctx.group(), &root);
        let name = qualified
            .rsplit_once('.')
            .map_or(qualified.as_str(), |(_, name)| name)
            .to_owned();
        if qualified != name {
            ctx.add_import(qualified);
        }
        wrappers.push(name);
    }

    wrappers
}

/// `CompositionLocalProvider(...)` call exposing the page path and front matter.
fn markdown_context_call(path: &str, front_matter: &FrontMatter) -> String {
    let entries: Vec<String> = front_matter
        .data
        .iter()
        .map(|(key, values)| {
            let values: Vec<String> = values
                .iter()
                .map(|value| format!("\"{}\"", escape_kotlin_string(value)))
                .collect();
            format!(
                "\"{}\" to listOf({})",
                escape_kotlin_string(key),
                values.join(", ")
            )
        })
        .collect();
    format!(
        "CompositionLocalProvider(LocalMarkdownContext provides MarkdownContext(\"{}\", mapOf({})))",
        escape_kotlin_string(path),
        entries.join(", ")
    )
}
