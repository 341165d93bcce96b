//! Error types for the runtime layer.

use std::path::PathBuf;

/// Errors raised while loading graphs or configuring verification.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    /// Error from the core library (parsing, missing inputs).
    #[error(transparent)]
    Core(#[from] gapkit_core::GapError),

    /// A cache key could not be computed for an input file.
    #[error("Cannot stat input {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Verifier or cache settings are unusable.
    #[error("Invalid runtime configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with RuntimeError.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_is_transparent() {
        let err: RuntimeError = gapkit_core::GapError::MissingInput(PathBuf::from("premises.txt")).into();
        assert_eq!(err.to_string(), "Input file not found: premises.txt");
    }
}
