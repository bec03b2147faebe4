//! # advisor-runtime
//!
//! Concrete backends for the capabilities the engine consumes.
//!
//! ## Backends
//!
//! - **Ollama** (default): chat completions and embeddings from a local Ollama server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use advisor_runtime::ollama::{OllamaConfig, OllamaEmbedder, OllamaProvider};
//!
//! let config = OllamaConfig::from_env();
//! let provider = Arc::new(OllamaProvider::from_config(config.clone()));
//! let embedder = Arc::new(OllamaEmbedder::from_config(config));
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaEmbedder, OllamaProvider};

// Re-export core types for convenience
pub use advisor_core::{CoreError, Embedder, EmbeddingError, LlmProvider, Message, Result, Role};
