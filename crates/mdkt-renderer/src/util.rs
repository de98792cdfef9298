//! Naming, escaping and path helpers shared by the renderer and the pipeline.

use pulldown_cmark::HeadingLevel;

/// Kotlin hard keywords, which cannot be used as bare package segments.
const KOTLIN_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

/// Escape text for use inside a Kotlin string literal.
///
/// Handles backslashes, quotes, string templates (`$`) and control characters.
#[must_use]
pub fn escape_kotlin_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '$' => result.push_str("\\$"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}

/// Upper-case the first character of `s`.
#[must_use]
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name of the generated page function for a markdown file stem.
///
/// # Examples
///
/// ```
/// use mdkt_renderer::function_name_for;
///
/// assert_eq!(function_name_for("index"), "IndexPage");
/// assert_eq!(function_name_for("getting-started"), "GettingStartedPage");
/// assert_eq!(function_name_for("404"), "_404Page");
/// ```
#[must_use]
pub fn function_name_for(stem: &str) -> String {
    let mut name: String = stem
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize_first)
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.push_str("Page");
    name
}

/// Convert a directory name into a valid Kotlin package segment.
///
/// Lower-cases, maps separators to `_`, drops other punctuation, and guards
/// against leading digits and keywords.
#[must_use]
pub fn package_segment(name: &str) -> String {
    let mut segment = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            segment.extend(c.to_lowercase());
        } else if matches!(c, '-' | '_' | ' ' | '.') {
            segment.push('_');
        }
    }
    if segment.is_empty() || segment.starts_with(|c: char| c.is_ascii_digit()) {
        segment.insert(0, '_');
    }
    if KOTLIN_KEYWORDS.contains(&segment.as_str()) {
        segment.push('_');
    }
    segment
}

/// Resolve a `.`-prefixed name against the project group.
///
/// # Examples
///
/// ```
/// use mdkt_renderer::resolve_package_shortcut;
///
/// assert_eq!(resolve_package_shortcut("com.example", ".pages"), "com.example.pages");
/// assert_eq!(resolve_package_shortcut("com.example", "org.other"), "org.other");
/// ```
#[must_use]
pub fn resolve_package_shortcut(group: &str, name: &str) -> String {
    match name.strip_prefix('.') {
        Some("") => group.to_owned(),
        Some(rest) if group.is_empty() => rest.to_owned(),
        Some(rest) => format!("{group}.{rest}"),
        None => name.to_owned(),
    }
}

/// Site route for a root-relative markdown path.
///
/// Directories go through [`package_segment`] so the route follows the
/// package the page is generated into; the file stem is lower-cased.
/// `guide.md` → `/guide`, `blog/2024/My-Post.md` → `/blog/_2024/my-post`,
/// `docs/index.md` → `/docs`, `index.md` → `/`.
#[must_use]
pub fn route_for(relative_path: &str) -> String {
    let path = relative_path.trim_start_matches('/');
    let (dirs, file_name) = match path.rsplit_once('/') {
        Some((dirs, file_name)) => (dirs, file_name),
        None => ("", path),
    };
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);

    let mut segments: Vec<String> = dirs
        .split('/')
        .filter(|dir| !dir.is_empty())
        .map(package_segment)
        .collect();
    if stem != "index" {
        segments.push(stem.to_lowercase());
    }
    format!("/{}", segments.join("/"))
}

/// Convert text into a URL-friendly heading id.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
