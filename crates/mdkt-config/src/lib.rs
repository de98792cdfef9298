//! Configuration management for mdkt.
//!
//! Parses `mdkt.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `project.group`
//! - `markdown.pages_package`
//! - `markdown.default_root`
//! - `markdown.imports`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override author markdown roots.
    pub roots: Option<Vec<PathBuf>>,
    /// Override the generated Kotlin output directory.
    pub output_dir: Option<PathBuf>,
    /// Override project group.
    pub group: Option<String>,
    /// Override the markdown artifact flag.
    pub markdown_artifact: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdkt.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration.
    pub project: ProjectConfig,
    /// Markdown configuration (paths are relative strings from TOML).
    markdown: MarkdownConfigRaw,
    /// Parser feature toggles.
    pub features: FeaturesConfig,

    /// Resolved markdown configuration (set after loading).
    #[serde(skip)]
    pub markdown_resolved: MarkdownConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    #[allow(clippy::derivable_impls)]
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Project configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Base package of the project (e.g., `com.example.site`).
    pub group: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            group: "app".to_owned(),
        }
    }
}

/// Raw markdown configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MarkdownConfigRaw {
    roots: Option<Vec<String>>,
    generated_dir: Option<String>,
    output_dir: Option<String>,
    pages_package: Option<String>,
    default_root: Option<String>,
    imports: Option<Vec<String>>,
    markdown_artifact: Option<bool>,
    exclude: Option<Vec<String>>,
}

/// Resolved markdown configuration with absolute paths.
#[derive(Debug, Default)]
pub struct MarkdownConfig {
    /// Author content roots, in lookup order.
    pub roots: Vec<PathBuf>,
    /// Root for markdown produced by earlier generation steps.
    pub generated_dir: PathBuf,
    /// Directory receiving generated Kotlin sources. Cleared on every run.
    pub output_dir: PathBuf,
    /// Project directory for mdkt data (.mdkt/).
    pub project_dir: PathBuf,
    /// Package for generated pages; a leading `.` is relative to the group.
    pub pages_package: String,
    /// Layout composable wrapping every page unless its front matter says otherwise.
    pub default_root: Option<String>,
    /// Imports added to every generated file.
    pub imports: Vec<String>,
    /// Whether generated code may rely on the markdown runtime artifact.
    pub markdown_artifact: bool,
    /// Glob patterns (relative to a root) of files to skip during discovery.
    pub exclude: Vec<String>,
}

impl MarkdownConfig {
    /// All roots used for discovery and cross-reference resolution.
    ///
    /// Author roots come first, followed by the generated-content root.
    #[must_use]
    pub fn all_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.roots.clone();
        roots.push(self.generated_dir.clone());
        roots
    }
}

/// Parser feature toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeaturesConfig {
    /// GitHub Flavored Markdown extensions (tables, strikethrough, task lists).
    pub gfm: bool,
    /// YAML front matter at the top of a document.
    pub front_matter: bool,
    /// `[^label]` footnotes.
    pub footnotes: bool,
    /// `$...$` and `$$...$$` math.
    pub math: bool,
    /// Definition lists.
    pub definition_lists: bool,
    /// `^superscript^` and `~subscript~`.
    pub superscript: bool,
}

impl Default for FeaturesConfig {
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

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`project.group`").
        field: String,
        /// Error message (e.g., "${`GROUP`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a dotted name made of Kotlin identifiers (e.g., `com.example.site`).
///
/// With `allow_relative`, a single leading `.` is accepted (package shortcut).
fn require_qualified_name(value: &str, field: &str, allow_relative: bool) -> Result<(), ConfigError> {
    let name = match value.strip_prefix('.') {
        Some(rest) if allow_relative => rest,
        _ => value,
    };
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(ConfigError::Validation(format!(
            "{field} must be a dotted name of identifiers, got '{value}'"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdkt.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(roots) = &settings.roots {
            self.markdown_resolved.roots.clone_from(roots);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.markdown_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(group) = &settings.group {
            self.project.group.clone_from(group);
        }
        if let Some(markdown_artifact) = settings.markdown_artifact {
            self.markdown_resolved.markdown_artifact = markdown_artifact;
        }
    }

    /// Fully qualified base package for generated pages.
    ///
    /// Resolves the `.`-prefixed shortcut in `pages_package` against the group.
    #[must_use]
    pub fn pages_package(&self) -> String {
        let pages = &self.markdown_resolved.pages_package;
        match pages.strip_prefix('.') {
            Some(rest) if rest.is_empty() => self.project.group.clone(),
            Some(rest) => format!("{}.{rest}", self.project.group),
            None => pages.clone(),
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            project: ProjectConfig::default(),
            markdown: MarkdownConfigRaw::default(),
            features: FeaturesConfig::default(),
            markdown_resolved: MarkdownConfig {
                roots: vec![base.join("src/markdown")],
                generated_dir: base.join(".mdkt/generated/markdown"),
                output_dir: base.join(".mdkt/generated/kotlin"),
                project_dir: base.join(".mdkt"),
                pages_package: ".pages".to_owned(),
                default_root: None,
                imports: Vec::new(),
                markdown_artifact: false,
                exclude: Vec::new(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_project()?;
        self.validate_markdown()?;
        Ok(())
    }

    /// Validate project configuration.
    fn validate_project(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.project.group, "project.group")?;
        require_qualified_name(&self.project.group, "project.group", false)
    }

    /// Validate markdown configuration.
    fn validate_markdown(&self) -> Result<(), ConfigError> {
        let markdown = &self.markdown_resolved;

        if markdown.roots.is_empty() {
            return Err(ConfigError::Validation(
                "markdown.roots must list at least one directory".to_owned(),
            ));
        }

        require_non_empty(&markdown.pages_package, "markdown.pages_package")?;
        if markdown.pages_package != "." {
            require_qualified_name(&markdown.pages_package, "markdown.pages_package", true)?;
        }

        if let Some(root) = markdown.default_root.as_deref()
            && !root.is_empty()
        {
            require_qualified_name(root, "markdown.default_root", true)?;
        }

        for import in &markdown.imports {
            require_non_empty(import.trim(), "markdown.imports entry")?;
        }

        if markdown.roots.contains(&markdown.output_dir)
            || markdown.output_dir == markdown.generated_dir
        {
            return Err(ConfigError::Validation(
                "markdown.output_dir must not be one of the markdown roots".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.project.group = expand::expand_env(&self.project.group, "project.group")?;

        if let Some(ref pages_package) = self.markdown.pages_package {
            self.markdown.pages_package =
                Some(expand::expand_env(pages_package, "markdown.pages_package")?);
        }

        if let Some(ref default_root) = self.markdown.default_root {
            self.markdown.default_root =
                Some(expand::expand_env(default_root, "markdown.default_root")?);
        }

        if let Some(ref mut imports) = self.markdown.imports {
            for import in imports.iter_mut() {
                *import = expand::expand_env(import, "markdown.imports")?;
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));
        let markdown = &self.markdown;

        let roots = match &markdown.roots {
            Some(roots) => roots.iter().map(|r| config_dir.join(r)).collect(),
            None => vec![config_dir.join("src/markdown")],
        };

        self.markdown_resolved = MarkdownConfig {
            roots,
            generated_dir: resolve(
                markdown.generated_dir.as_deref(),
                ".mdkt/generated/markdown",
            ),
            output_dir: resolve(markdown.output_dir.as_deref(), ".mdkt/generated/kotlin"),
            project_dir: config_dir.join(".mdkt"),
            pages_package: markdown
                .pages_package
                .clone()
                .unwrap_or_else(|| ".pages".to_owned()),
            default_root: markdown
                .default_root
                .clone()
                .filter(|root| !root.trim().is_empty()),
            imports: markdown.imports.clone().unwrap_or_default(),
            markdown_artifact: markdown.markdown_artifact.unwrap_or(false),
            exclude: markdown.exclude.clone().unwrap_or_default(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.project.group, "app");
        assert_eq!(
            config.markdown_resolved.roots,
            vec![PathBuf::from("/test/src/markdown")]
        );
        assert_eq!(
            config.markdown_resolved.generated_dir,
            PathBuf::from("/test/.mdkt/generated/markdown")
        );
        assert_eq!(
            config.markdown_resolved.output_dir,
            PathBuf::from("/test/.mdkt/generated/kotlin")
        );
        assert_eq!(config.markdown_resolved.pages_package, ".pages");
        assert!(!config.markdown_resolved.markdown_artifact);
        assert!(config.features.gfm);
        assert!(config.features.front_matter);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = "";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.project.group, "app");
        assert!(config.features.gfm);
    }

    #[test]
    fn test_parse_project_config() {
        let toml = r#"
[project]
group = "com.example.site"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.project.group, "com.example.site");
    }

    #[test]
    fn test_parse_features_config() {
        let toml = r"
[features]
gfm = false
math = true
definition_lists = true
";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.features.gfm);
        assert!(config.features.front_matter);
        assert!(config.features.footnotes);
        assert!(config.features.math);
        assert!(config.features.definition_lists);
        assert!(!config.features.superscript);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[markdown]
roots = ["content", "shared/markdown"]
generated_dir = "build/generated/markdown"
output_dir = "build/generated/kotlin"
pages_package = ".docs"
default_root = ".components.layouts.DocsLayout"
imports = ["com.example.widgets.*"]
markdown_artifact = true
exclude = ["drafts/**"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        let markdown = &config.markdown_resolved;
        assert_eq!(
            markdown.roots,
            vec![
                PathBuf::from("/project/content"),
                PathBuf::from("/project/shared/markdown"),
            ]
        );
        assert_eq!(
            markdown.generated_dir,
            PathBuf::from("/project/build/generated/markdown")
        );
        assert_eq!(
            markdown.output_dir,
            PathBuf::from("/project/build/generated/kotlin")
        );
        assert_eq!(markdown.project_dir, PathBuf::from("/project/.mdkt"));
        assert_eq!(markdown.pages_package, ".docs");
        assert_eq!(
            markdown.default_root.as_deref(),
            Some(".components.layouts.DocsLayout")
        );
        assert_eq!(markdown.imports, vec!["com.example.widgets.*".to_owned()]);
        assert!(markdown.markdown_artifact);
        assert_eq!(markdown.exclude, vec!["drafts/**".to_owned()]);
    }

    #[test]
    fn test_blank_default_root_is_none() {
        let toml = r#"
[markdown]
default_root = "  "
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));
        assert_eq!(config.markdown_resolved.default_root, None);
    }

    #[test]
    fn test_all_roots_puts_generated_last() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(
            config.markdown_resolved.all_roots(),
            vec![
                PathBuf::from("/test/src/markdown"),
                PathBuf::from("/test/.mdkt/generated/markdown"),
            ]
        );
    }

    #[test]
    fn test_pages_package_shortcut() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.project.group = "com.example".to_owned();
        assert_eq!(config.pages_package(), "com.example.pages");

        config.markdown_resolved.pages_package = "org.other.pages".to_owned();
        assert_eq!(config.pages_package(), "org.other.pages");

        config.markdown_resolved.pages_package = ".".to_owned();
        assert_eq!(config.pages_package(), "com.example");
    }

    #[test]
    fn test_apply_cli_settings_roots() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            roots: Some(vec![PathBuf::from("/custom/docs")]),
            ..Default::default()
        };
        config.apply_cli_settings(&settings);
        assert_eq!(
            config.markdown_resolved.roots,
            vec![PathBuf::from("/custom/docs")]
        );
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            output_dir: Some(PathBuf::from("/out")),
            group: Some("com.example".to_owned()),
            markdown_artifact: Some(true),
            ..Default::default()
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.markdown_resolved.output_dir, PathBuf::from("/out"));
        assert_eq!(config.project.group, "com.example");
        assert!(config.markdown_resolved.markdown_artifact);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.project.group, "app");
        assert_eq!(
            config.markdown_resolved.output_dir,
            PathBuf::from("/test/.mdkt/generated/kotlin")
        );
    }

    #[test]
    fn test_expand_env_vars_group_and_imports() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEST_MDKT_GROUP", "com.acme");
        }

        let toml = r#"
[project]
group = "${TEST_MDKT_GROUP}"

[markdown]
imports = ["${TEST_MDKT_GROUP}.widgets.*"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.project.group, "com.acme");
        assert_eq!(
            config.markdown.imports,
            Some(vec!["com.acme.widgets.*".to_owned()])
        );

        unsafe {
            std::env::remove_var("TEST_MDKT_GROUP");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_MDKT_TEST");
        }

        let toml = r#"
[markdown]
default_root = "${MISSING_VAR_MDKT_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_MDKT_TEST"));
        assert!(err.to_string().contains("markdown.default_root"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[project]
group = "com.example"

[markdown]
roots = ["docs"]
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.project.group, "com.example");
        assert_eq!(config.markdown_resolved.roots, vec![dir.path().join("docs")]);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/mdkt.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_group_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.project.group = String::new();
        assert_validation_error(&config, &["project.group", "empty"]);
    }

    #[test]
    fn test_validate_group_invalid_segment() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.project.group = "com.1example".to_owned();
        assert_validation_error(&config, &["project.group", "com.1example"]);
    }

    #[test]
    fn test_validate_relative_group_rejected() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.project.group = ".example".to_owned();
        assert_validation_error(&config, &["project.group"]);
    }

    #[test]
    fn test_validate_no_roots() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.markdown_resolved.roots.clear();
        assert_validation_error(&config, &["markdown.roots"]);
    }

    #[test]
    fn test_validate_default_root_name() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.markdown_resolved.default_root = Some(".layouts.Docs Layout".to_owned());
        assert_validation_error(&config, &["markdown.default_root"]);

        config.markdown_resolved.default_root = Some(".layouts.DocsLayout".to_owned());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_output_dir_inside_roots() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.markdown_resolved.output_dir = PathBuf::from("/test/src/markdown");
        assert_validation_error(&config, &["markdown.output_dir"]);
    }

    #[test]
    fn test_validate_empty_import() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.markdown_resolved.imports = vec![" ".to_owned()];
        assert_validation_error(&config, &["markdown.imports"]);
    }
}
