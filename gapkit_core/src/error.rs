//! Error types for gapkit core.

use std::path::PathBuf;

/// Main error type for the core library.
///
/// All core operations return `Result<T> = std::result::Result<T, GapError>`.
#[derive(thiserror::Error, Debug)]
pub enum GapError {
    /// A declaration or dependency edge is not in the graph.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A flat-file or report record could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A semantic comparator could not produce a verdict.
    #[error("Comparator error: {0}")]
    Comparator(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result with GapError.
pub type Result<T> = std::result::Result<T, GapError>;
