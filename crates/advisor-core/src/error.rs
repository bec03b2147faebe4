//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Embedding capability failures.
///
/// Always recovered locally: retrieval degrades to "no extra context".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    /// Embedding backend unreachable or returned an error
    #[error("Embedding backend unavailable: {0}")]
    Unavailable(String),

    /// Backend returned a vector of the wrong size
    #[error("Invalid embedding: expected {expected} dimensions, got {actual}")]
    Dimensions { expected: usize, actual: usize },

    /// Turn handed to the index without an embedding
    #[error("Turn {0} has no embedding")]
    Missing(String),
}

/// Conversation log write/read failures.
///
/// Surfaced to the caller on the write path; losing a turn is not locally recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Failed to write turn: {0}")]
    Write(String),

    #[error("Failed to read turns: {0}")]
    Read(String),
}

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl CoreError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::Persistence(_) => {
                "We couldn't save your message. Please try again.".into()
            }
            Self::Embedding(_) => "An unexpected error occurred.".into(),
        }
    }
}
