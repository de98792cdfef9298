//! Node-kind dispatch.
//!
//! A [`HandlerTable`] maps every [`NodeKind`] to exactly one [`NodeHandler`].
//! Handlers receive the node and a [`RenderScope`], through which they
//! render children, emit indented lines and reach the [`RenderContext`].

use std::collections::HashMap;

use crate::context::{RenderContext, ResolvedDocument};
use crate::node::{Node, NodeKind};

/// Indentation unit of generated Kotlin code.
pub const INDENT: &str = "    ";

/// Package of the Compose HTML DOM composables.
pub const DOM_PACKAGE: &str = "org.jetbrains.compose.web.dom";

/// Fully qualified name of a Compose HTML DOM composable.
#[must_use]
pub fn dom_import(name: &str) -> String {
    format!("{DOM_PACKAGE}.{name}")
}

/// Renders one node kind into Kotlin source.
pub trait NodeHandler: Send + Sync {
    fn render(&self, node: &Node, scope: &mut RenderScope<'_, '_>) -> String;
}

impl<F> NodeHandler for F
where
    F: Fn(&Node, &mut RenderScope<'_, '_>) -> String + Send + Sync,
{
    fn render(&self, node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
        self(node, scope)
    }
}

/// Handler used for kinds without an explicit entry.
///
/// Leaves render their literal as a `Text` call, containers render their
/// children in place.
fn default_fallback(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
    match node.literal() {
        Some(literal) => scope.text_call(literal),
        None => scope.render_children(node),
    }
}

/// Mapping from node kind to handler.
pub struct HandlerTable {
    handlers: HashMap<NodeKind, Box<dyn NodeHandler>>,
    fallback: Box<dyn NodeHandler>,
}

impl HandlerTable {
    /// Table without any entries; every node goes to the fallback.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Box::new(default_fallback),
        }
    }

    /// Register a closure for `kind`, replacing any previous entry.
    #[must_use]
    pub fn with<F>(self, kind: NodeKind, handler: F) -> Self
    where
        F: Fn(&Node, &mut RenderScope<'_, '_>) -> String + Send + Sync + 'static,
    {
        self.with_handler(kind, handler)
    }

    /// Register a handler value for `kind`, replacing any previous entry.
    #[must_use]
    pub fn with_handler<H: NodeHandler + 'static>(mut self, kind: NodeKind, handler: H) -> Self {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Replace the fallback handler.
    #[must_use]
    pub fn with_fallback<H: NodeHandler + 'static>(mut self, handler: H) -> Self {
        self.fallback = Box::new(handler);
        self
    }

    /// Whether `kind` has an explicit entry.
    #[must_use]
    pub fn handles(&self, kind: NodeKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    fn handler_for(&self, kind: NodeKind) -> &dyn NodeHandler {
        match self.handlers.get(&kind) {
            Some(handler) => handler.as_ref(),
            None => self.fallback.as_ref(),
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::compose_html()
    }
}

/// Traversal state handed to handlers.
pub struct RenderScope<'s, 'a> {
    handlers: &'s HandlerTable,
    ctx: &'s mut RenderContext<'a>,
    depth: usize,
    /// Kinds of the nodes enclosing the one being rendered, outermost first.
    ancestors: Vec<NodeKind>,
}

impl<'s, 'a> RenderScope<'s, 'a> {
    /// Create a scope emitting lines at `depth` levels of indentation.
    pub fn new(handlers: &'s HandlerTable, ctx: &'s mut RenderContext<'a>, depth: usize) -> Self {
        Self {
            handlers,
            ctx,
            depth,
            ancestors: Vec::new(),
        }
    }

    /// Dispatch `node` to its handler.
    pub fn render(&mut self, node: &Node) -> String {
        let handlers = self.handlers;
        handlers.handler_for(node.kind()).render(node, self)
    }

    /// Render the children of `node` at the current depth.
    pub fn render_children(&mut self, node: &Node) -> String {
        self.ancestors.push(node.kind());
        let mut output = String::new();
        for child in &node.children {
            output.push_str(&self.render(child));
        }
        self.ancestors.pop();
        output
    }

    /// Emit `call { <children> }`, or `call {}` when nothing is rendered inside.
    pub fn block(&mut self, call: &str, node: &Node) -> String {
        self.wrap(call, |scope| scope.render_children(node))
    }

    /// Emit `call { ... }` around arbitrary content rendered by `inner`.
    pub fn wrap(&mut self, call: &str, inner: impl FnOnce(&mut Self) -> String) -> String {
        self.depth += 1;
        let body = inner(self);
        self.depth -= 1;
        if body.is_empty() {
            return self.line(&format!("{call} {{}}"));
        }
        let mut output = self.line(&format!("{call} {{"));
        output.push_str(&body);
        output.push_str(&self.line("}"));
        output
    }

    /// One line of output at the current indentation.
    #[must_use]
    pub fn line(&self, text: &str) -> String {
        format!("{}{text}\n", INDENT.repeat(self.depth))
    }

    /// `Text("...")` call with `literal` escaped.
    pub fn text_call(&mut self, literal: &str) -> String {
        self.ctx.add_import(dom_import("Text"));
        self.line(&format!(
            "Text(\"{}\")",
            crate::util::escape_kotlin_string(literal)
        ))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Kind of the node whose children are being rendered.
    pub fn parent_kind(&self) -> Option<NodeKind> {
        self.ancestors.last().copied()
    }

    /// Whether any enclosing node has the given kind.
    pub fn inside(&self, kind: NodeKind) -> bool {
        self.ancestors.contains(&kind)
    }

    pub fn context(&self) -> &RenderContext<'a> {
        self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RenderContext<'a> {
        self.ctx
    }

    /// Render the body of another document in place.
    ///
    /// Returns `None` when the document is already being rendered further up
    /// the include chain. The embedded document's front matter is ignored.
    pub fn embed(&mut self, document: &ResolvedDocument) -> Option<String> {
        if self.ctx.is_rendering(&document.path) {
            return None;
        }

        // Enclosing kinds of the host document do not apply inside the embed.
        let ancestors = std::mem::take(&mut self.ancestors);
        let previous_source = self.ctx.enter_document(document);
        let output = self.render_children(&document.node);
        self.ctx.leave_document(previous_source);
        self.ancestors = ancestors;

        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullResolver;
    use crate::node::NodeValue;
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> Node {
        Node::new(NodeValue::Text(value.to_owned()))
    }

    fn paragraph(children: Vec<Node>) -> Node {
        Node::with_children(NodeValue::Paragraph, children)
    }

    #[test]
    fn test_fallback_renders_literals_and_children() {
        let table = HandlerTable::empty();
        let mut ctx = RenderContext::new("p", "F", &NullResolver);
        let mut scope = RenderScope::new(&table, &mut ctx, 1);

        let output = scope.render(&paragraph(vec![text("a \"b\""), text("$c")]));
        assert_eq!(output, "    Text(\"a \\\"b\\\"\")\n    Text(\"\\$c\")\n");
        assert_eq!(
            ctx.imports().collect::<Vec<_>>(),
            vec!["org.jetbrains.compose.web.dom.Text"]
        );
    }

    #[test]
    fn test_override_replaces_entry() {
        let table = HandlerTable::empty()
            .with(NodeKind::Text, |node, scope| {
                scope.line(&format!("Custom({})", node.literal().unwrap_or_default()))
            })
            .with(NodeKind::Text, |_node, scope| scope.line("Replaced()"));
        assert!(table.handles(NodeKind::Text));
        assert!(!table.handles(NodeKind::Paragraph));

        let mut ctx = RenderContext::new("p", "F", &NullResolver);
        let mut scope = RenderScope::new(&table, &mut ctx, 0);
        assert_eq!(scope.render(&text("x")), "Replaced()\n");
    }

    fn unsupported(node: &Node, scope: &mut RenderScope<'_, '_>) -> String {
        scope.line(&format!("// unsupported: {:?}", node.kind()))
    }

    #[test]
    fn test_custom_fallback() {
        let table = HandlerTable::empty()
            .with(NodeKind::Paragraph, |node, scope| scope.block("P", node))
            .with_fallback(unsupported);
        let mut ctx = RenderContext::new("p", "F", &NullResolver);
        let mut scope = RenderScope::new(&table, &mut ctx, 0);

        assert_eq!(
            scope.render(&paragraph(vec![text("x")])),
            "P {\n    // unsupported: Text\n}\n"
        );
        assert_eq!(ctx.imports().count(), 0);
    }

    #[test]
    fn test_block_nests_and_collapses_empty() {
        let table = HandlerTable::empty()
            .with(NodeKind::Paragraph, |node, scope| scope.block("P", node));
        let mut ctx = RenderContext::new("p", "F", &NullResolver);
        let mut scope = RenderScope::new(&table, &mut ctx, 1);

        assert_eq!(
            scope.render(&paragraph(vec![text("hi")])),
            "    P {\n        Text(\"hi\")\n    }\n"
        );
        assert_eq!(scope.render(&paragraph(vec![])), "    P {}\n");
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_parent_kind_tracks_enclosing_node() {
        let table = HandlerTable::empty().with(NodeKind::Text, |_node, scope| {
            scope.line(&format!("{:?}", scope.parent_kind()))
        });
        let mut ctx = RenderContext::new("p", "F", &NullResolver);
        let mut scope = RenderScope::new(&table, &mut ctx, 0);

        let tree = Node::with_children(
            NodeValue::Document,
            vec![paragraph(vec![text("x")]), text("y")],
        );
        assert_eq!(scope.render(&tree), "Some(Paragraph)\nSome(Document)\n");
        assert_eq!(scope.parent_kind(), None);
    }

    #[test]
    fn test_handlers_can_add_imports() {
        let table = HandlerTable::empty().with(NodeKind::Rule, |_node, scope| {
            scope.context_mut().add_import("org.jetbrains.compose.web.dom.Hr");
            scope.line("Hr()")
        });
        let mut ctx = RenderContext::new("p", "F", &NullResolver);
        {
            let mut scope = RenderScope::new(&table, &mut ctx, 0);
            scope.render(&Node::new(NodeValue::Rule));
        }
        assert_eq!(
            ctx.imports().collect::<Vec<_>>(),
            vec!["org.jetbrains.compose.web.dom.Hr"]
        );
    }
}
