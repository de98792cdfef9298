//! Default Compose HTML handlers.
//!
//! Each handler emits calls to `org.jetbrains.compose.web.dom` composables
//! and registers the imports it needs. Resolved markdown links become Silk
//! `Link` calls to the target page route.

use crate::context::{Reference, markdown_reference};
use crate::handler::{HandlerTable, RenderScope, dom_import};
use crate::node::{Node, NodeKind, NodeValue};
use crate::util::{escape_kotlin_string, route_for};

/// Silk navigation link used for resolved markdown links.
pub const SILK_LINK: &str = "com.varabyte.kobweb.silk.components.navigation.Link";

impl HandlerTable {
    /// Handler table emitting Compose HTML.
    #[must_use]
    pub fn compose_html() -> Self {
        Self::empty()
            .with(NodeKind::Document, |node, scope| scope.render_children(node))
            .with(NodeKind::FrontMatter, |_node, _scope| String::new())
            .with(NodeKind::Paragraph, paragraph)
            .with(NodeKind::Heading, heading)
            .with(NodeKind::BlockQuote, |node, scope| element(scope, "Blockquote", node))
            .with(NodeKind::CodeBlock, code_block)
            .with(NodeKind::HtmlBlock, |node, scope| raw_html(scope, "Div", node))
            .with(NodeKind::Html, |node, scope| raw_html(scope, "Span", node))
            .with(NodeKind::List, list)
            .with(NodeKind::Item, |node, scope| element(scope, "Li", node))
            .with(NodeKind::TaskListMarker, task_list_marker)
            .with(NodeKind::Table, table)
            .with(NodeKind::TableHead, |node, scope| {
                let thead = dom(scope, "Thead");
                let tr = dom(scope, "Tr");
                scope.wrap(&thead, |scope| scope.block(&tr, node))
            })
            .with(NodeKind::TableRow, |node, scope| element(scope, "Tr", node))
            .with(NodeKind::TableCell, |node, scope| {
                let name = if scope.inside(NodeKind::TableHead) { "Th" } else { "Td" };
                element(scope, name, node)
            })
            .with(NodeKind::Emphasis, |node, scope| element(scope, "Em", node))
            .with(NodeKind::Strong, |node, scope| element(scope, "B", node))
            .with(NodeKind::Strikethrough, |node, scope| element(scope, "S", node))
            .with(NodeKind::Superscript, |node, scope| element(scope, "Sup", node))
            .with(NodeKind::Subscript, |node, scope| element(scope, "Sub", node))
            .with(NodeKind::Link, link)
            .with(NodeKind::Image, image)
            .with(NodeKind::Text, |node, scope| {
                scope.text_call(node.literal().unwrap_or_default())
            })
            .with(NodeKind::Code, |node, scope| {
                let code = dom(scope, "Code");
                let literal = node.literal().unwrap_or_default();
                scope.wrap(&code, |scope| scope.text_call(literal))
            })
            .with(NodeKind::Math, math)
            .with(NodeKind::SoftBreak, |_node, scope| scope.text_call(" "))
            .with(NodeKind::HardBreak, |_node, scope| {
                let br = dom(scope, "Br");
                scope.line(&format!("{br}()"))
            })
            .with(NodeKind::Rule, |_node, scope| {
                let hr = dom(scope, "Hr");
                scope.line(&format!("{hr}()"))
            })
            .with(NodeKind::FootnoteDefinition, footnote_definition)
            .with(NodeKind::FootnoteReference, footnote_reference)
            .with(NodeKind::DefinitionList, |node, scope| element(scope, "Dl", node))
            .with(NodeKind::DefinitionListTitle, |node, scope| element(scope, "Dt", node))
            .with(NodeKind::DefinitionListDefinition, |node, scope| {
                element(scope, "Dd", node)
            })
    }
}

/// Import a DOM composable and return its simple name.
fn dom(scope: &mut RenderScope<'_, '_>, name: &str) -> String {
    scope.context_mut().add_import(dom_import(name));
    name.to_owned()
}

/// `Name { <children> }`.
fn element(scope: &mut RenderScope<'_, '_>, name: &str, node: &Node) -> String {
    let name = dom(scope, name);
    scope.block(&name, node)
}

/// Quoted, escaped Kotlin string literal.
fn quoted(value: &str) -> String {
    format!("\"{}\"", escape_kotlin_string(value))
}

/// Whether `node` is an image embedding another markdown document.
fn is_embed(node: &Node) -> bool {
    matches!(
        &node.value,
        NodeValue::Image { destination, .. } if markdown_reference(destination).is_some()
    )
}

fn paragraph(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    // A paragraph holding nothing but an embed is replaced by the embedded body.
    if let [child] = node.children.as_slice()
        && is_embed(child)
    {
        return scope.render(child);
    }
    element(scope, "P", node)
}

fn heading(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::Heading { level, id } = &node.value else {
        return scope.render_children(node);
    };
    let name = dom(scope, &format!("H{level}"));
    let id = match id {
        Some(id) => id.clone(),
        None => scope.context_mut().heading_id(&node.plain_text()),
    };
    if id.is_empty() {
        scope.block(&name, node)
    } else {
        scope.block(&format!("{name}(attrs = {{ id({}) }})", quoted(&id)), node)
    }
}

fn code_block(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::CodeBlock { language, literal } = &node.value else {
        return scope.render_children(node);
    };
    let pre = dom(scope, "Pre");
    let code = dom(scope, "Code");
    let code = match language {
        Some(language) => format!(
            "{code}(attrs = {{ classes({}) }})",
            quoted(&format!("language-{language}"))
        ),
        None => code,
    };
    scope.wrap(&pre, |scope| scope.wrap(&code, |scope| scope.text_call(literal)))
}

/// Raw HTML is assigned to the element's `innerHTML`.
fn raw_html(scope: &mut RenderScope<'_, '_>, container: &str, node: &Node) -> String {
    let html = node.literal().unwrap_or_default();
    if html.trim().is_empty() {
        return String::new();
    }
    let container = dom(scope, container);
    scope.line(&format!(
        "{container}(attrs = {{ ref {{ it.innerHTML = {}; onDispose {{}} }} }})",
        quoted(html.trim_end())
    ))
}

fn list(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    match node.value {
        NodeValue::List { start: Some(1) } => element(scope, "Ol", node),
        NodeValue::List { start: Some(start) } => {
            let ol = dom(scope, "Ol");
            scope.block(&format!("{ol}(attrs = {{ attr(\"start\", \"{start}\") }})"), node)
        }
        _ => element(scope, "Ul", node),
    }
}

fn task_list_marker(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let checked = matches!(node.value, NodeValue::TaskListMarker(true));
    let checkbox = dom(scope, "CheckboxInput");
    scope.line(&format!(
        "{checkbox}(checked = {checked}, attrs = {{ disabled() }})"
    ))
}

fn table(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let table = dom(scope, "Table");
    let (head, rows): (Vec<&Node>, Vec<&Node>) = node
        .children
        .iter()
        .partition(|child| child.kind() == NodeKind::TableHead);

    scope.wrap(&table, |scope| {
        let mut output = String::new();
        for child in head {
            output.push_str(&scope.render(child));
        }
        if !rows.is_empty() {
            let tbody = dom(scope, "Tbody");
            output.push_str(&scope.wrap(&tbody, |scope| {
                rows.iter().map(|row| scope.render(row)).collect()
            }));
        }
        output
    })
}

fn link(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::Link { destination, title } = &node.value else {
        return scope.render_children(node);
    };

    match scope.context_mut().resolve_reference(destination) {
        Reference::Resolved { document, fragment } => {
            scope.context_mut().add_import(SILK_LINK);
            let mut route = route_for(&document.relative_path);
            if let Some(fragment) = fragment {
                route.push_str(&fragment);
            }
            scope.block(&format!("Link({})", quoted(&route)), node)
        }
        Reference::External | Reference::Unresolved => {
            let a = dom(scope, "A");
            let call = if title.is_empty() {
                format!("{a}(href = {})", quoted(destination))
            } else {
                format!(
                    "{a}(href = {}, attrs = {{ title({}) }})",
                    quoted(destination),
                    quoted(title)
                )
            };
            scope.block(&call, node)
        }
    }
}

fn image(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::Image { destination, title } = &node.value else {
        return scope.render_children(node);
    };
    let alt = node.plain_text();

    match scope.context_mut().resolve_reference(destination) {
        Reference::Resolved { document, .. } => match scope.embed(&document) {
            Some(body) => body,
            None => {
                let message = format!(
                    "Cyclic markdown embed '{destination}' in {}",
                    scope.context().source_path()
                );
                scope.context_mut().warn(message);
                scope.text_call(&format!("![{alt}]({destination})"))
            }
        },
        Reference::Unresolved => scope.text_call(&format!("![{alt}]({destination})")),
        Reference::External => {
            let img = dom(scope, "Img");
            let mut call = format!("{img}(src = {}, alt = {}", quoted(destination), quoted(&alt));
            if !title.is_empty() {
                call.push_str(&format!(", attrs = {{ title({}) }}", quoted(title)));
            }
            call.push(')');
            scope.line(&call)
        }
    }
}

fn math(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::Math { display, literal } = &node.value else {
        return scope.render_children(node);
    };
    let (container, class) = if *display {
        ("Div", "math-display")
    } else {
        ("Span", "math-inline")
    };
    let container = dom(scope, container);
    scope.wrap(
        &format!("{container}(attrs = {{ classes({}) }})", quoted(class)),
        |scope| scope.text_call(literal),
    )
}

fn footnote_definition(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::FootnoteDefinition(label) = &node.value else {
        return scope.render_children(node);
    };
    let div = dom(scope, "Div");
    scope.block(
        &format!(
            "{div}(attrs = {{ id({}); classes(\"footnote\") }})",
            quoted(&format!("fn-{label}"))
        ),
        node,
    )
}

fn footnote_reference(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    let NodeValue::FootnoteReference(label) = &node.value else {
        return String::new();
    };
    let sup = dom(scope, "Sup");
    let a = dom(scope, "A");
    let href = quoted(&format!("#fn-{label}"));
    scope.wrap(&sup, |scope| {
        scope.wrap(&format!("{a}(href = {href})"), |scope| scope.text_call(label))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DocumentResolver, NullResolver, RenderContext, ResolvedDocument};
    use crate::parser::{CommonMarkParser, MarkdownParser, ParserOptions};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// In-memory resolver keyed by root-relative path.
    struct MapResolver {
        documents: HashMap<&'static str, &'static str>,
    }

    impl MapResolver {
        fn new(documents: &[(&'static str, &'static str)]) -> Self {
            Self {
                documents: documents.iter().copied().collect(),
            }
        }
    }

    impl DocumentResolver for MapResolver {
        fn get_relative(&self, relative_path: &str) -> Option<ResolvedDocument> {
            let text = self.documents.get(relative_path)?;
            let node = CommonMarkParser::default().parse(text).ok()?;
            Some(ResolvedDocument {
                path: PathBuf::from("/docs").join(relative_path),
                relative_path: relative_path.to_owned(),
                node: Arc::new(node),
            })
        }
    }

    fn render_with(markdown: &str, resolver: &dyn DocumentResolver) -> (String, Vec<String>) {
        let tree = CommonMarkParser::default().parse(markdown).unwrap();
        let table = HandlerTable::compose_html();
        let mut ctx = RenderContext::new("app.pages", "IndexPage", resolver).with_source(
            "index.md",
            Some(PathBuf::from("/docs/index.md")),
        );
        let output = RenderScope::new(&table, &mut ctx, 0).render(&tree);
        (output, ctx.warnings().to_vec())
    }

    fn render(markdown: &str) -> String {
        render_with(markdown, &NullResolver).0
    }

    #[test]
    fn test_paragraph_with_emphasis() {
        assert_eq!(
            render("Hello *big* **world**"),
            "P {\n    Text(\"Hello \")\n    Em {\n        Text(\"big\")\n    }\n    Text(\" \")\n    B {\n        Text(\"world\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_heading_ids() {
        assert_eq!(
            render("## Getting Started\n\n## Getting Started"),
            "H2(attrs = { id(\"getting-started\") }) {\n    Text(\"Getting Started\")\n}\n\
             H2(attrs = { id(\"getting-started-1\") }) {\n    Text(\"Getting Started\")\n}\n"
        );
        assert!(render("# Custom {#my-id}").starts_with("H1(attrs = { id(\"my-id\") }) {\n"));
    }

    #[test]
    fn test_code_block_escapes_literal() {
        assert_eq!(
            render("```kotlin\nval x = \"$y\"\n```"),
            "Pre {\n    Code(attrs = { classes(\"language-kotlin\") }) {\n        Text(\"val x = \\\"\\$y\\\"\\n\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            render("- a\n- b"),
            "Ul {\n    Li {\n        Text(\"a\")\n    }\n    Li {\n        Text(\"b\")\n    }\n}\n"
        );
        assert_eq!(
            render("3. c"),
            "Ol(attrs = { attr(\"start\", \"3\") }) {\n    Li {\n        Text(\"c\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_task_list() {
        let output = render("- [x] done");
        assert!(output.contains("CheckboxInput(checked = true, attrs = { disabled() })"));
    }

    #[test]
    fn test_table_head_and_body() {
        let output = render("| A |\n|---|\n| 1 |");
        assert_eq!(
            output,
            "Table {\n    Thead {\n        Tr {\n            Th {\n                Text(\"A\")\n            }\n        }\n    }\n    Tbody {\n        Tr {\n            Td {\n                Text(\"1\")\n            }\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_external_link_and_image() {
        let output = render("[site](https://example.com \"Home\") ![logo](logo.png)");
        assert!(output.contains("A(href = \"https://example.com\", attrs = { title(\"Home\") }) {"));
        assert!(output.contains("Img(src = \"logo.png\", alt = \"logo\")"));
    }

    #[test]
    fn test_resolved_link_uses_route() {
        let resolver = MapResolver::new(&[("docs/setup.md", "# Setup")]);
        let (output, warnings) = render_with("[Setup](docs/setup.md#install)", &resolver);
        assert!(output.contains("Link(\"/docs/setup#install\") {\n        Text(\"Setup\")\n    }"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_link_degrades_to_anchor() {
        let (output, warnings) = render_with("[Gone](missing.md)", &NullResolver);
        assert!(output.contains("A(href = \"missing.md\") {"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing.md"));
    }

    #[test]
    fn test_embed_renders_target_body() {
        let resolver = MapResolver::new(&[("guide.md", "---\ntitle: Guide\n---\nHello")]);
        let (output, warnings) = render_with("![guide](guide.md)", &resolver);
        assert_eq!(output, "P {\n    Text(\"Hello\")\n}\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_embed_degrades_to_text() {
        let (output, warnings) = render_with("![part](part.md)", &NullResolver);
        assert_eq!(output, "Text(\"![part](part.md)\")\n");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_cyclic_embed_degrades_to_text() {
        let resolver = MapResolver::new(&[
            ("a.md", "A\n\n![b](b.md)"),
            ("b.md", "B\n\n![a](a.md)"),
        ]);
        let (output, warnings) = render_with("![a](a.md)", &resolver);
        assert_eq!(
            output,
            "P {\n    Text(\"A\")\n}\nP {\n    Text(\"B\")\n}\nText(\"![a](a.md)\")\n"
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Cyclic"));
    }

    #[test]
    fn test_self_embed_is_cycle() {
        let resolver = MapResolver::new(&[("index.md", "Self")]);
        let (output, warnings) = render_with("![me](index.md)", &resolver);
        assert_eq!(output, "Text(\"![me](index.md)\")\n");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_raw_html_block() {
        let output = render("<div class=\"note\">Hi</div>\n");
        assert_eq!(
            output,
            "Div(attrs = { ref { it.innerHTML = \"<div class=\\\"note\\\">Hi</div>\"; onDispose {} } })\n"
        );
    }

    #[test]
    fn test_imports_collected() {
        let tree = CommonMarkParser::default().parse("# T\n\n---\n\n`x`").unwrap();
        let table = HandlerTable::compose_html();
        let mut ctx = RenderContext::new("app.pages", "IndexPage", &NullResolver);
        RenderScope::new(&table, &mut ctx, 0).render(&tree);
        assert_eq!(
            ctx.imports().collect::<Vec<_>>(),
            vec![
                "org.jetbrains.compose.web.dom.Code",
                "org.jetbrains.compose.web.dom.H1",
                "org.jetbrains.compose.web.dom.Hr",
                "org.jetbrains.compose.web.dom.P",
                "org.jetbrains.compose.web.dom.Text",
            ]
        );
    }

    /// Render with every parser extension enabled.
    fn render_extended(markdown: &str) -> String {
        let tree = CommonMarkParser::new(ParserOptions::all())
            .parse(markdown)
            .unwrap();
        let table = HandlerTable::compose_html();
        let mut ctx = RenderContext::new("app.pages", "IndexPage", &NullResolver);
        RenderScope::new(&table, &mut ctx, 0).render(&tree)
    }

    #[test]
    fn test_footnotes() {
        assert_eq!(
            render("Note[^1]\n\n[^1]: Details\n"),
            "P {\n    Text(\"Note\")\n    Sup {\n        A(href = \"#fn-1\") {\n            Text(\"1\")\n        }\n    }\n}\n\
             Div(attrs = { id(\"fn-1\"); classes(\"footnote\") }) {\n    P {\n        Text(\"Details\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_inline_and_display_math() {
        assert_eq!(
            render_extended("$x$\n\n$$y$$\n"),
            "P {\n    Span(attrs = { classes(\"math-inline\") }) {\n        Text(\"x\")\n    }\n}\n\
             P {\n    Div(attrs = { classes(\"math-display\") }) {\n        Text(\"y\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_math_disabled_by_default() {
        assert_eq!(render("$x$"), "P {\n    Text(\"\\$x\\$\")\n}\n");
    }

    #[test]
    fn test_definition_list() {
        assert_eq!(
            render_extended("Term\n:   Meaning\n"),
            "Dl {\n    Dt {\n        Text(\"Term\")\n    }\n    Dd {\n        Text(\"Meaning\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_superscript_and_subscript() {
        assert_eq!(
            render_extended("^up^ ~down~"),
            "P {\n    Sup {\n        Text(\"up\")\n    }\n    Text(\" \")\n    Sub {\n        Text(\"down\")\n    }\n}\n"
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(render("~~gone~~"), "P {\n    S {\n        Text(\"gone\")\n    }\n}\n");
    }
}
