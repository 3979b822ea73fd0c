use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// An operation needed an embedding provider but the store has none bound.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider failures surface as-is.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding configuration error: {0}")]
    Config(String),

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Embedding batch length mismatch: expected {expected}, got {actual}")]
    BatchLengthMismatch { expected: usize, actual: usize },
}
