//! Markdown syntax tree.
//!
//! A [`Node`] pairs a [`NodeValue`] (the tagged variant carrying per-kind
//! data) with its children in document order. [`NodeKind`] is the fieldless
//! discriminant used as the key of the handler table.

use std::collections::BTreeMap;

/// Parsed YAML front matter of a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// Layout composable wrapping the page (`root:` key).
    ///
    /// `Some("")` explicitly disables the configured default root.
    pub root: Option<String>,
    /// Extra imports for the generated file (`imports:` key).
    pub imports: Vec<String>,
    /// Every key as a list of strings, scalars becoming one-element lists.
    pub data: BTreeMap<String, Vec<String>>,
}

/// Node data, one variant per markdown construct.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeValue {
    Document,
    FrontMatter(FrontMatter),
    Paragraph,
    Heading {
        level: u8,
        /// Explicit `{#id}` attribute, if present.
        id: Option<String>,
    },
    BlockQuote,
    CodeBlock {
        language: Option<String>,
        literal: String,
    },
    HtmlBlock(String),
    List {
        /// First item number for ordered lists, `None` for bullet lists.
        start: Option<u64>,
    },
    Item,
    TaskListMarker(bool),
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link {
        destination: String,
        title: String,
    },
    Image {
        destination: String,
        title: String,
    },
    Text(String),
    Code(String),
    Html(String),
    Math {
        display: bool,
        literal: String,
    },
    SoftBreak,
    HardBreak,
    Rule,
    FootnoteDefinition(String),
    FootnoteReference(String),
    DefinitionList,
    DefinitionListTitle,
    DefinitionListDefinition,
}

/// Fieldless discriminant of [`NodeValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Document,
    FrontMatter,
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    HtmlBlock,
    List,
    Item,
    TaskListMarker,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link,
    Image,
    Text,
    Code,
    Html,
    Math,
    SoftBreak,
    HardBreak,
    Rule,
    FootnoteDefinition,
    FootnoteReference,
    DefinitionList,
    DefinitionListTitle,
    DefinitionListDefinition,
}

impl NodeValue {
    /// Kind used for handler dispatch.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Document => NodeKind::Document,
            Self::FrontMatter(_) => NodeKind::FrontMatter,
            Self::Paragraph => NodeKind::Paragraph,
            Self::Heading { .. } => NodeKind::Heading,
            Self::BlockQuote => NodeKind::BlockQuote,
            Self::CodeBlock { .. } => NodeKind::CodeBlock,
            Self::HtmlBlock(_) => NodeKind::HtmlBlock,
            Self::List { .. } => NodeKind::List,
            Self::Item => NodeKind::Item,
            Self::TaskListMarker(_) => NodeKind::TaskListMarker,
            Self::Table => NodeKind::Table,
            Self::TableHead => NodeKind::TableHead,
            Self::TableRow => NodeKind::TableRow,
            Self::TableCell => NodeKind::TableCell,
            Self::Emphasis => NodeKind::Emphasis,
            Self::Strong => NodeKind::Strong,
            Self::Strikethrough => NodeKind::Strikethrough,
            Self::Superscript => NodeKind::Superscript,
            Self::Subscript => NodeKind::Subscript,
            Self::Link { .. } => NodeKind::Link,
            Self::Image { .. } => NodeKind::Image,
            Self::Text(_) => NodeKind::Text,
            Self::Code(_) => NodeKind::Code,
            Self::Html(_) => NodeKind::Html,
            Self::Math { .. } => NodeKind::Math,
            Self::SoftBreak => NodeKind::SoftBreak,
            Self::HardBreak => NodeKind::HardBreak,
            Self::Rule => NodeKind::Rule,
            Self::FootnoteDefinition(_) => NodeKind::FootnoteDefinition,
            Self::FootnoteReference(_) => NodeKind::FootnoteReference,
            Self::DefinitionList => NodeKind::DefinitionList,
            Self::DefinitionListTitle => NodeKind::DefinitionListTitle,
            Self::DefinitionListDefinition => NodeKind::DefinitionListDefinition,
        }
    }
}

/// A node of the markdown syntax tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub value: NodeValue,
    pub children: Vec<Node>,
}

impl Node {
    /// Create a node without children.
    #[must_use]
    pub fn new(value: NodeValue) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    /// Create a node with the given children.
    #[must_use]
    pub fn with_children(value: NodeValue, children: Vec<Node>) -> Self {
        Self { value, children }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.value.kind()
    }

    /// Literal source text carried by leaf nodes.
    ///
    /// Returns `None` for container nodes, whose content lives in their children.
    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Text(text)
            | NodeValue::Code(text)
            | NodeValue::Html(text)
            | NodeValue::HtmlBlock(text)
            | NodeValue::CodeBlock { literal: text, .. }
            | NodeValue::Math { literal: text, .. } => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of all descendants, without markup.
    ///
    /// Soft and hard breaks become single spaces.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        match &self.value {
            NodeValue::Text(text) | NodeValue::Code(text) => out.push_str(text),
            NodeValue::SoftBreak | NodeValue::HardBreak => out.push(' '),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Front matter of a document node, if its first child carries one.
    #[must_use]
    pub fn front_matter(&self) -> Option<&FrontMatter> {
        match self.children.first().map(|child| &child.value) {
            Some(NodeValue::FrontMatter(front_matter)) => Some(front_matter),
            _ => None,
        }
    }
}
