//! `mdkt convert` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use mdkt_config::{CliSettings, Config};
use mdkt_pipeline::Pipeline;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Path to configuration file (default: auto-discover mdkt.toml).
    #[arg(short, long, env = "MDKT_CONFIG")]
    config: Option<PathBuf>,

    /// Markdown root directory, may be repeated (overrides config).
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Directory receiving generated Kotlin sources (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project group used for `.`-prefixed packages (overrides config).
    #[arg(short, long)]
    group: Option<String>,

    /// Provide the markdown runtime context to generated pages.
    #[arg(long)]
    markdown_artifact: bool,

    /// Enable verbose output (log every generated file).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the conversion aborts.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config_path = ?config.config_path, "Loaded configuration");
        let markdown = &config.markdown_resolved;

        ensure_project_dir(&markdown.project_dir)?;

        for root in markdown.all_roots() {
            output.info(&format!("Root: {}", root.display()));
        }
        output.info(&format!("Output: {}", markdown.output_dir.display()));
        output.info(&format!("Package: {}", config.pages_package()));

        let summary = Pipeline::from_config(&config).run()?;

        for warning in &summary.warnings {
            output.warning(&format!("Warning: {warning}"));
        }
        output.success(&format!(
            "Generated {} file(s) in {} ({} warning(s))",
            summary.files.len(),
            markdown.output_dir.display(),
            summary.warnings.len()
        ));
        Ok(())
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            roots: (!self.roots.is_empty()).then(|| self.roots.clone()),
            output_dir: self.output.clone(),
            group: self.group.clone(),
            markdown_artifact: self.markdown_artifact.then_some(true),
        }
    }
}

/// Ensure the `.mdkt/` project directory exists with a `.gitignore`.
fn ensure_project_dir(project_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(project_dir)?;

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let _ = std::fs::write(&gitignore_path, "# Automatically created by mdkt\n*\n");
    }

    Ok(())
}
