//! Conversion driver.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdkt_cache::{DocumentCache, RootSet};
use mdkt_config::Config;
use mdkt_renderer::{CommonMarkParser, KotlinRenderer, Node, ParserOptions, RenderContext};

use crate::error::PipelineError;
use crate::output::{OutputMapping, map_output};
use crate::scanner::{Scanner, SourceFile};

/// One generated Kotlin file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Canonical path of the markdown input.
    pub source: PathBuf,
    /// Path of the written Kotlin file.
    pub output: PathBuf,
}

/// Outcome of a successful run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Generated files in processing order.
    pub files: Vec<GeneratedFile>,
    /// Warnings from all rendered files (unresolved or cyclic references).
    pub warnings: Vec<String>,
}

/// Converts markdown under a set of roots into Kotlin page sources.
///
/// Every run is a full pass: the output directory is cleared and all inputs
/// are regenerated. Processing is single-threaded and ordered by canonical
/// input path, so repeated runs produce identical files.
#[derive(Clone, Debug)]
pub struct Pipeline {
    roots: Vec<PathBuf>,
    generated_dir: Option<PathBuf>,
    output_dir: PathBuf,
    group: String,
    pages_package: String,
    default_root: Option<String>,
    imports: Vec<String>,
    markdown_artifact: bool,
    exclude: Vec<String>,
    parser_options: ParserOptions,
}

impl Pipeline {
    /// Create a pipeline reading `roots` (in lookup order) and writing to `output_dir`.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            roots,
            generated_dir: None,
            output_dir: output_dir.into(),
            group: String::new(),
            pages_package: "pages".to_owned(),
            default_root: None,
            imports: Vec::new(),
            markdown_artifact: false,
            exclude: Vec::new(),
            parser_options: ParserOptions::default(),
        }
    }

    /// Create a pipeline from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let markdown = &config.markdown_resolved;
        Self::new(markdown.roots.clone(), markdown.output_dir.clone())
            .with_generated_dir(markdown.generated_dir.clone())
            .with_group(config.project.group.clone())
            .with_pages_package(config.pages_package())
            .with_default_root(markdown.default_root.clone())
            .with_imports(markdown.imports.clone())
            .with_markdown_artifact(markdown.markdown_artifact)
            .with_exclude(markdown.exclude.clone())
            .with_parser_options(ParserOptions {
                gfm: config.features.gfm,
                front_matter: config.features.front_matter,
                footnotes: config.features.footnotes,
                math: config.features.math,
                definition_lists: config.features.definition_lists,
                superscript: config.features.superscript,
            })
    }

    /// Root for markdown produced by earlier generation steps.
    ///
    /// Searched after the author roots and created if missing.
    #[must_use]
    pub fn with_generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.generated_dir = Some(dir.into());
        self
    }

    /// Project group, used to resolve `.`-prefixed layout names.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Fully qualified base package for generated pages.
    #[must_use]
    pub fn with_pages_package(mut self, package: impl Into<String>) -> Self {
        self.pages_package = package.into();
        self
    }

    #[must_use]
    pub fn with_default_root(mut self, root: Option<String>) -> Self {
        self.default_root = root;
        self
    }

    /// Imports added to every generated file.
    #[must_use]
    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    #[must_use]
    pub fn with_markdown_artifact(mut self, enabled: bool) -> Self {
        self.markdown_artifact = enabled;
        self
    }

    /// Glob patterns of root-relative paths skipped during discovery.
    #[must_use]
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    #[must_use]
    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.parser_options = options;
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Discover every markdown file under the roots and convert it.
    ///
    /// # Errors
    ///
    /// See [`run_files`](Self::run_files).
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let roots = self.root_set()?;
        let files = Scanner::new(&self.exclude).scan(&roots);
        tracing::info!(count = files.len(), "Discovered markdown files");
        let inputs: Vec<PathBuf> = files.into_iter().map(|file| file.path).collect();
        self.convert(roots, &inputs)
    }

    /// Convert the given markdown files.
    ///
    /// Other documents under the roots are only read when referenced.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Roots`] if a root cannot be used
    /// - [`PipelineError::Parse`] if an input is missing, outside the roots or unparsable
    /// - [`PipelineError::OutputCollision`] if two inputs generate the same file
    /// - [`PipelineError::FunctionCollision`] if two inputs declare the same page function
    /// - [`PipelineError::OutputDir`] if the output directory cannot be prepared
    /// - [`PipelineError::Write`] if a generated file cannot be written
    pub fn run_files(&self, files: &[PathBuf]) -> Result<RunSummary, PipelineError> {
        let roots = self.root_set()?;
        self.convert(roots, files)
    }

    fn root_set(&self) -> Result<RootSet, PipelineError> {
        let mut roots = self.roots.clone();
        if let Some(generated) = &self.generated_dir {
            fs::create_dir_all(generated).map_err(|source| {
                PipelineError::Roots(mdkt_cache::CacheError::Root {
                    path: generated.clone(),
                    source,
                })
            })?;
            roots.push(generated.clone());
        }
        RootSet::new(&roots).map_err(PipelineError::Roots)
    }

    fn convert(&self, roots: RootSet, files: &[PathBuf]) -> Result<RunSummary, PipelineError> {
        let cache = DocumentCache::new(CommonMarkParser::new(self.parser_options), roots);

        let inputs = plan(&cache, files, &self.pages_package)?;
        check_collisions(&inputs)?;

        // Parse every input before touching the output directory.
        let mut trees: Vec<Arc<Node>> = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let tree = cache.get(&input.file.path).map_err(|source| PipelineError::Parse {
                path: input.file.path.clone(),
                source,
            })?;
            trees.push(tree);
        }

        self.prepare_output_dir(cache.roots())?;

        let renderer = KotlinRenderer::new();
        let mut summary = RunSummary::default();
        for (input, tree) in inputs.iter().zip(&trees) {
            let mut ctx = RenderContext::new(
                input.mapping.package.clone(),
                input.mapping.function_name.clone(),
                &cache,
            )
            .with_group(self.group.clone())
            .with_imports(self.imports.iter().cloned())
            .with_default_root(self.default_root.clone())
            .with_markdown_artifact(self.markdown_artifact)
            .with_source(
                input.file.relative_path.clone(),
                Some(input.file.path.clone()),
            );

            let result = renderer.render(tree, &mut ctx);
            let output = self.output_dir.join(&input.mapping.relative_output);
            write_file(&output, &result.source)?;
            tracing::info!(
                source = %input.file.relative_path,
                output = %output.display(),
                "Generated"
            );

            summary.warnings.extend(result.warnings);
            summary.files.push(GeneratedFile {
                source: input.file.path.clone(),
                output,
            });
        }

        tracing::debug!(documents = cache.len(), "Parsed documents");
        Ok(summary)
    }

    /// Clear and recreate the output directory.
    ///
    /// Refuses to touch a directory that contains or lies inside a root.
    fn prepare_output_dir(&self, roots: &RootSet) -> Result<(), PipelineError> {
        let output_error = |source| PipelineError::OutputDir {
            path: self.output_dir.clone(),
            source,
        };

        let canonical = canonicalize_lenient(&self.output_dir).map_err(output_error)?;
        if roots
            .roots()
            .iter()
            .any(|root| root.starts_with(&canonical) || canonical.starts_with(root))
        {
            return Err(output_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output directory overlaps a markdown root",
            )));
        }

        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir).map_err(output_error)?;
        }
        fs::create_dir_all(&self.output_dir).map_err(output_error)
    }
}

/// Canonicalize a path that may not exist yet.
///
/// The longest existing prefix is canonicalized and the missing components
/// are appended unchanged.
fn canonicalize_lenient(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                return Ok(missing.iter().rev().fold(canonical, |acc, name| acc.join(name)));
            }
            Err(e) => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(e);
                };
                missing.push(name);
                existing = parent;
            }
        }
    }
}

/// A direct input with its output mapping.
struct PlannedInput {
    file: SourceFile,
    mapping: OutputMapping,
}

/// Canonicalize inputs, map them to outputs and order them by canonical path.
fn plan(
    cache: &DocumentCache,
    files: &[PathBuf],
    pages_package: &str,
) -> Result<Vec<PlannedInput>, PipelineError> {
    let mut inputs: Vec<PlannedInput> = Vec::with_capacity(files.len());
    for file in files {
        let canonical = file.canonicalize().map_err(|source| PipelineError::Parse {
            path: file.clone(),
            source: mdkt_cache::CacheError::Read {
                path: file.clone(),
                source,
            },
        })?;
        let relative_path = cache
            .roots()
            .relative_path(&canonical)
            .ok_or_else(|| PipelineError::Parse {
                path: file.clone(),
                source: mdkt_cache::CacheError::OutsideRoots {
                    path: canonical.clone(),
                },
            })?;
        let mapping = map_output(&relative_path, pages_package);
        inputs.push(PlannedInput {
            file: SourceFile {
                path: canonical,
                relative_path,
            },
            mapping,
        });
    }

    inputs.sort_by(|a, b| a.file.path.cmp(&b.file.path));
    inputs.dedup_by(|a, b| a.file.path == b.file.path);
    Ok(inputs)
}

/// Fail if two inputs would be written to the same file or declare the
/// same page function in one package.
fn check_collisions(inputs: &[PlannedInput]) -> Result<(), PipelineError> {
    let mut outputs: HashMap<&Path, &Path> = HashMap::with_capacity(inputs.len());
    let mut functions: HashMap<(&str, &str), &Path> = HashMap::with_capacity(inputs.len());
    for input in inputs {
        let output = input.mapping.relative_output.as_path();
        if let Some(first) = outputs.insert(output, &input.file.path) {
            return Err(PipelineError::OutputCollision {
                first: first.to_path_buf(),
                second: input.file.path.clone(),
                output: output.to_path_buf(),
            });
        }

        let key = (
            input.mapping.package.as_str(),
            input.mapping.function_name.as_str(),
        );
        if let Some(first) = functions.insert(key, &input.file.path) {
            return Err(PipelineError::FunctionCollision {
                first: first.to_path_buf(),
                second: input.file.path.clone(),
                function: qualified_function(&input.mapping),
            });
        }
    }
    Ok(())
}

/// `package.FunctionName`, or the bare name in the default package.
fn qualified_function(mapping: &OutputMapping) -> String {
    if mapping.package.is_empty() {
        mapping.function_name.clone()
    } else {
        format!("{}.{}", mapping.package, mapping.function_name)
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), PipelineError> {
    let write_error = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, content).map_err(write_error)
}
