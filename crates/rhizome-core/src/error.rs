//! Error types for Rhizome runs.
//!
//! Per-file problems (parse failures, unresolvable relative imports) are not
//! errors: they are recorded as [`Issue`](crate::config::Issue)s on the graph and
//! the run continues. `AnalysisError` covers the failures that abort a run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for Rhizome operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The project root does not exist or is not a directory.
    #[error("project root {} is not a directory", .0.display())]
    InvalidRoot(PathBuf),

    /// Discovery produced no source files.
    #[error("no source files found under {}", .0.display())]
    NoSourceFiles(PathBuf),

    /// Two files map onto the same module id, or an index lookup failed.
    #[error("inconsistent module index: {0}")]
    InconsistentModuleIndex(String),

    /// The ignore file could not be loaded.
    #[error("failed to load ignore rules from {}: {message}", path.display())]
    Ignore { path: PathBuf, message: String },

    /// Tree-sitter could not be initialised with the grammar.
    #[error("parser error: {0}")]
    Parser(String),

    /// Creating the output directory or writing an artifact failed.
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
