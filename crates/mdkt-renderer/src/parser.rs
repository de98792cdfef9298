//! Markdown parsing into a [`Node`] tree.
//!
//! [`MarkdownParser`] is the parsing seam; [`CommonMarkParser`] implements it
//! on top of pulldown-cmark's event stream.

use std::collections::BTreeMap;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::node::{FrontMatter, Node, NodeValue};
use crate::util::heading_level_to_num;

/// Error produced when markdown text cannot be turned into a tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Front matter is not valid YAML.
    #[error("invalid front matter: {0}")]
    FrontMatterSyntax(#[from] serde_yaml::Error),
    /// Front matter is valid YAML but has an unexpected shape.
    #[error("invalid front matter: {0}")]
    FrontMatterShape(String),
    /// The event stream did not nest properly.
    #[error("unbalanced markdown structure")]
    Unbalanced,
}

/// Turns markdown text into a syntax tree.
///
/// Implementations must be deterministic: the same text always yields an
/// equal tree.
pub trait MarkdownParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Node, ParseError>;
}

/// Parser feature toggles.
#[derive(Clone, Copy, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct ParserOptions {
    /// Tables, strikethrough, task lists and alerts.
    pub gfm: bool,
    /// YAML front matter delimited by `---`.
    pub front_matter: bool,
    /// `[^label]` references and their definitions.
    pub footnotes: bool,
    /// `$inline$` and `$$display$$` math.
    pub math: bool,
    /// `Term` followed by `: definition` lines.
    pub definition_lists: bool,
    /// `^super^` and `~sub~`; a single `~` no longer strikes through.
    pub superscript: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            front_matter: true,
            footnotes: true,
            math: false,
            definition_lists: false,
            superscript: false,
        }
    }
}

impl ParserOptions {
    /// Every supported extension enabled.
    #[must_use]
    pub fn all() -> Self {
        Self {
            gfm: true,
            front_matter: true,
            footnotes: true,
            math: true,
            definition_lists: true,
            superscript: true,
        }
    }
}

/// CommonMark parser backed by pulldown-cmark.
#[derive(Clone, Debug, Default)]
pub struct CommonMarkParser {
    options: ParserOptions,
}

impl CommonMarkParser {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// pulldown-cmark options for the configured features.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        let mut options = Options::ENABLE_HEADING_ATTRIBUTES;
        if self.options.gfm {
            options |= Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM;
        }
        if self.options.front_matter {
            options |= Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
        }
        if self.options.footnotes {
            options |= Options::ENABLE_FOOTNOTES;
        }
        if self.options.math {
            options |= Options::ENABLE_MATH;
        }
        if self.options.definition_lists {
            options |= Options::ENABLE_DEFINITION_LIST;
        }
        if self.options.superscript {
            options |= Options::ENABLE_SUPERSCRIPT | Options::ENABLE_SUBSCRIPT;
        }
        options
    }
}

impl MarkdownParser for CommonMarkParser {
    fn parse(&self, text: &str) -> Result<Node, ParseError> {
        let mut builder = TreeBuilder::new();
        for event in Parser::new_ext(text, self.parser_options()) {
            builder.event(event)?;
        }
        builder.finish()
    }
}

/// Assembles a tree from a flat start/end event stream.
struct TreeBuilder {
    stack: Vec<Node>,
    /// Raw YAML while inside a metadata block.
    yaml: Option<String>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Node::new(NodeValue::Document)],
            yaml: None,
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ParseError> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag)?,
            Event::Text(text) => self.text(&text),
            Event::Html(html) => self.html(&html),
            Event::Code(code) => self.leaf(NodeValue::Code(code.into_string())),
            Event::InlineHtml(html) => self.leaf(NodeValue::Html(html.into_string())),
            Event::InlineMath(math) => self.leaf(NodeValue::Math {
                display: false,
                literal: math.into_string(),
            }),
            Event::DisplayMath(math) => self.leaf(NodeValue::Math {
                display: true,
                literal: math.into_string(),
            }),
            Event::FootnoteReference(label) => {
                self.leaf(NodeValue::FootnoteReference(label.into_string()));
            }
            Event::SoftBreak => self.leaf(NodeValue::SoftBreak),
            Event::HardBreak => self.leaf(NodeValue::HardBreak),
            Event::Rule => self.leaf(NodeValue::Rule),
            Event::TaskListMarker(checked) => self.leaf(NodeValue::TaskListMarker(checked)),
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>) {
        let value = match tag {
            Tag::Paragraph => NodeValue::Paragraph,
            Tag::Heading { level, id, .. } => NodeValue::Heading {
                level: heading_level_to_num(level),
                id: id.map(|id| id.into_string()),
            },
            Tag::BlockQuote(_) => NodeValue::BlockQuote,
            Tag::CodeBlock(kind) => NodeValue::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                },
                literal: String::new(),
            },
            Tag::HtmlBlock => NodeValue::HtmlBlock(String::new()),
            Tag::List(start) => NodeValue::List { start },
            Tag::Item => NodeValue::Item,
            Tag::FootnoteDefinition(label) => NodeValue::FootnoteDefinition(label.into_string()),
            Tag::DefinitionList => NodeValue::DefinitionList,
            Tag::DefinitionListTitle => NodeValue::DefinitionListTitle,
            Tag::DefinitionListDefinition => NodeValue::DefinitionListDefinition,
            Tag::Table(_) => NodeValue::Table,
            Tag::TableHead => NodeValue::TableHead,
            Tag::TableRow => NodeValue::TableRow,
            Tag::TableCell => NodeValue::TableCell,
            Tag::Emphasis => NodeValue::Emphasis,
            Tag::Strong => NodeValue::Strong,
            Tag::Strikethrough => NodeValue::Strikethrough,
            Tag::Superscript => NodeValue::Superscript,
            Tag::Subscript => NodeValue::Subscript,
            Tag::Link {
                dest_url, title, ..
            } => NodeValue::Link {
                destination: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::Image {
                dest_url, title, ..
            } => NodeValue::Image {
                destination: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::MetadataBlock(_) => {
                self.yaml = Some(String::new());
                NodeValue::FrontMatter(FrontMatter::default())
            }
        };
        self.stack.push(Node::new(value));
    }

    fn end(&mut self, tag: TagEnd) -> Result<(), ParseError> {
        // The document node is never closed by an event.
        if self.stack.len() < 2 {
            return Err(ParseError::Unbalanced);
        }
        let mut node = self.stack.pop().ok_or(ParseError::Unbalanced)?;
        if let TagEnd::MetadataBlock(_) = tag {
            let yaml = self.yaml.take().unwrap_or_default();
            node.value = NodeValue::FrontMatter(parse_front_matter(&yaml)?);
        }
        self.push_child(node);
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(yaml) = self.yaml.as_mut() {
            yaml.push_str(text);
            return;
        }
        let Some(current) = self.stack.last_mut() else {
            return;
        };
        match &mut current.value {
            NodeValue::CodeBlock { literal, .. } | NodeValue::HtmlBlock(literal) => {
                literal.push_str(text);
            }
            // Adjacent text events are merged into one node.
            _ => {
                if let Some(Node {
                    value: NodeValue::Text(previous),
                    ..
                }) = current.children.last_mut()
                {
                    previous.push_str(text);
                } else {
                    current
                        .children
                        .push(Node::new(NodeValue::Text(text.to_owned())));
                }
            }
        }
    }

    fn html(&mut self, html: &str) {
        match self.stack.last_mut().map(|node| &mut node.value) {
            Some(NodeValue::HtmlBlock(literal)) => literal.push_str(html),
            _ => self.leaf(NodeValue::Html(html.to_owned())),
        }
    }

    fn leaf(&mut self, value: NodeValue) {
        self.push_child(Node::new(value));
    }

    fn push_child(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }

    fn finish(mut self) -> Result<Node, ParseError> {
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(root), true) => Ok(root),
            _ => Err(ParseError::Unbalanced),
        }
    }
}

/// Parse a YAML front matter block.
///
/// `root` must be a string (or null), `imports` a string or a list of
/// strings. Every key is also kept in [`FrontMatter::data`] as a list of
/// strings.
pub fn parse_front_matter(yaml: &str) -> Result<FrontMatter, ParseError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }

    let mapping: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(yaml)?;
    let mut front_matter = FrontMatter::default();

    for (key, value) in mapping {
        let values = yaml_strings(&key, &value)?;
        match key.as_str() {
            "root" => {
                if values.len() > 1 {
                    return Err(ParseError::FrontMatterShape(
                        "'root' must be a single name".to_owned(),
                    ));
                }
                let root = values.first().cloned().unwrap_or_default();
                let trimmed = root.trim();
                if !trimmed.is_empty() && !is_qualified_name(trimmed, true) {
                    return Err(ParseError::FrontMatterShape(format!(
                        "'root' must be a dotted name of identifiers, got '{root}'"
                    )));
                }
                front_matter.root = Some(root);
            }
            "imports" => {
                if let Some(import) = values.iter().find(|import| !is_import(import)) {
                    return Err(ParseError::FrontMatterShape(format!(
                        "'imports' entries must be qualified names, got '{import}'"
                    )));
                }
                front_matter.imports.clone_from(&values);
            }
            _ => {}
        }
        front_matter.data.insert(key, values);
    }

    Ok(front_matter)
}

/// `a.b.C`, or `.b.C` when `allow_relative` is set.
fn is_qualified_name(name: &str, allow_relative: bool) -> bool {
    let name = match name.strip_prefix('.') {
        Some(rest) if allow_relative => rest,
        _ => name,
    };
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Kotlin import target: a qualified name, optionally ending in `.*`.
fn is_import(import: &str) -> bool {
    let name = import.strip_suffix(".*").unwrap_or(import);
    is_qualified_name(name, false)
}

/// Flatten a YAML value into strings: scalars become one element, sequences
/// of scalars one element each, null becomes empty.
fn yaml_strings(key: &str, value: &serde_yaml::Value) -> Result<Vec<String>, ParseError> {
    use serde_yaml::Value;

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                scalar(item).ok_or_else(|| {
                    ParseError::FrontMatterShape(format!("'{key}' must contain only scalars"))
                })
            })
            .collect(),
        other => scalar(other).map(|s| vec![s]).ok_or_else(|| {
            ParseError::FrontMatterShape(format!("'{key}' must be a scalar or a list"))
        }),
    }
}
