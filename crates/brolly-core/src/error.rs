use thiserror::Error;

/// Top-level error type for the Brolly system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates construct
/// the matching variant (or implement `From` for their own error types) so
/// that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BrollyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for BrollyError {
    fn from(err: toml::de::Error) -> Self {
        BrollyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BrollyError {
    fn from(err: toml::ser::Error) -> Self {
        BrollyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BrollyError {
    fn from(err: serde_json::Error) -> Self {
        BrollyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Brolly operations.
pub type Result<T> = std::result::Result<T, BrollyError>;
