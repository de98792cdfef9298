//! Mapping from markdown inputs to generated Kotlin files.

use std::path::PathBuf;

use mdkt_renderer::{capitalize_first, function_name_for, package_segment};

/// Where and under which names a markdown file is generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputMapping {
    /// Kotlin package of the generated file.
    pub package: String,
    /// Name of the generated `@Page` function.
    pub function_name: String,
    /// Path of the generated file, relative to the output directory.
    pub relative_output: PathBuf,
}

/// Map a root-relative markdown path to its generated file.
///
/// `blog/2024/my-post.md` with base package `com.example.pages` becomes
/// package `com.example.pages.blog._2024`, function `MyPostPage`, written to
/// `com/example/pages/blog/_2024/My-post.kt`.
#[must_use]
pub fn map_output(relative_path: &str, base_package: &str) -> OutputMapping {
    let (dirs, file_name) = match relative_path.rsplit_once('/') {
        Some((dirs, file_name)) => (dirs, file_name),
        None => ("", relative_path),
    };
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);

    let mut segments: Vec<String> = base_package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect();
    segments.extend(
        dirs.split('/')
            .filter(|dir| !dir.is_empty())
            .map(package_segment),
    );

    let mut relative_output: PathBuf = segments.iter().collect();
    relative_output.push(format!("{}.kt", capitalize_first(stem)));

    OutputMapping {
        package: segments.join("."),
        function_name: function_name_for(stem),
        relative_output,
    }
}
