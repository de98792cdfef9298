//! Pipeline error types.

use std::path::PathBuf;

use mdkt_cache::CacheError;

/// Fatal error aborting a conversion run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The configured roots cannot be used.
    #[error("Invalid markdown roots: {0}")]
    Roots(#[source] CacheError),
    /// A direct input cannot be read or parsed.
    #[error("Cannot convert {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CacheError,
    },
    /// Two inputs map to the same generated file.
    #[error(
        "{} and {} both generate {}",
        .first.display(),
        .second.display(),
        .output.display()
    )]
    OutputCollision {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },
    /// Two inputs declare the same page function in one package.
    #[error(
        "{} and {} both declare {}",
        .first.display(),
        .second.display(),
        .function
    )]
    FunctionCollision {
        first: PathBuf,
        second: PathBuf,
        function: String,
    },
    /// The output directory cannot be cleared or created.
    #[error("Cannot prepare output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A generated file cannot be written.
    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
