//! Markdown to Kotlin conversion pipeline.
//!
//! Ties the pieces together for one full conversion pass:
//!
//! 1. [`Scanner`] discovers `*.md` files under the configured roots
//! 2. [`map_output`] assigns each file a package, function name and output path
//! 3. colliding outputs abort the run before anything is written
//! 4. the output directory is cleared
//! 5. every file is rendered through a shared [`DocumentCache`](mdkt_cache::DocumentCache)
//!    and written out
//!
//! # Example
//!
//! ```no_run
//! use mdkt_pipeline::Pipeline;
//!
//! let summary = Pipeline::new(vec!["src/markdown".into()], "build/generated/kotlin")
//!     .with_group("com.example")
//!     .with_pages_package("com.example.pages")
//!     .run()
//!     .unwrap();
//! println!("{} files, {} warnings", summary.files.len(), summary.warnings.len());
//! ```

mod error;
mod output;
mod pipeline;
mod scanner;

pub use error::PipelineError;
pub use output::{OutputMapping, map_output};
pub use pipeline::{GeneratedFile, Pipeline, RunSummary};
pub use scanner::{Scanner, SourceFile};
