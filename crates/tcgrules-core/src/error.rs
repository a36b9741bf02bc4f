use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("No documents found under {}", .0.display())]
    EmptyCorpus(PathBuf),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors worth retrying: the failure is in an external capability, not in
    /// the caller's input or the persisted data.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::EmbeddingUnavailable(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
