//! Error types for the agent layer.

/// Error type for agent operations.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// Cycle or project configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A conjecture or attempt record could not be read back
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// LLM transport or response failure
    #[error("LLM request failed: {0}")]
    Llm(String),

    /// Error from the core library
    #[error(transparent)]
    Core(#[from] gapkit_core::GapError),

    /// Error from the runtime layer
    #[error(transparent)]
    Runtime(#[from] gapkit_runtime::RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
