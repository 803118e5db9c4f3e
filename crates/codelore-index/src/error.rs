//! Error types for codelore-index.

/// Errors that can occur during indexing and retrieval.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files or writing snapshots.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File content could not be decoded as text.
    #[error("cannot decode {path} as text")]
    Decode { path: String },

    /// LLM provider error (embedding).
    #[error("LLM error: {0}")]
    Llm(#[from] codelore_llm::LlmError),

    /// Persisted snapshot is unreadable.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
