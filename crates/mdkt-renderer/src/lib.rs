//! Markdown to Kotlin rendering.
//!
//! This crate turns markdown text into a generated Compose HTML `@Page`
//! function:
//! - [`MarkdownParser`] / [`CommonMarkParser`]: markdown text to a [`Node`] tree
//! - [`HandlerTable`]: one [`NodeHandler`] per [`NodeKind`], with a fallback
//! - [`KotlinRenderer`]: walks the tree and assembles the source file
//!
//! Cross-document links and embeds are resolved through the
//! [`DocumentResolver`] held by the per-file [`RenderContext`].
//!
//! # Example
//!
//! ```
//! use mdkt_renderer::{CommonMarkParser, KotlinRenderer, MarkdownParser, NullResolver, RenderContext};
//!
//! let tree = CommonMarkParser::default().parse("# Hello\n\n**Bold** text").unwrap();
//! let mut ctx = RenderContext::new("com.example.pages", "IndexPage", &NullResolver);
//! let result = KotlinRenderer::new().render(&tree, &mut ctx);
//! assert!(result.source.starts_with("package com.example.pages\n"));
//! assert!(result.source.contains("H1(attrs = { id(\"hello\") }) {"));
//! ```

mod compose;
mod context;
mod handler;
mod node;
mod parser;
mod renderer;
mod util;

pub use compose::SILK_LINK;
pub use context::{DocumentResolver, NullResolver, Reference, RenderContext, ResolvedDocument};
pub use handler::{DOM_PACKAGE, HandlerTable, INDENT, NodeHandler, RenderScope, dom_import};
pub use node::{FrontMatter, Node, NodeKind, NodeValue};
pub use parser::{CommonMarkParser, MarkdownParser, ParseError, ParserOptions, parse_front_matter};
pub use renderer::{BASE_IMPORTS, KotlinRenderer, MARKDOWN_CONTEXT_IMPORTS, RenderResult};
pub use util::{
    capitalize_first, escape_kotlin_string, function_name_for, package_segment,
    resolve_package_shortcut, route_for, slugify,
};
