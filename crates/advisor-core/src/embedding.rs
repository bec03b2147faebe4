//! Embedding Capability
//!
//! Producing a fixed-dimensionality vector for a text is an external
//! capability; the engine only consumes it through this trait.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Abstraction over embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality of every vector this backend returns.
    fn dimensions(&self) -> usize;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
