//! Application State

use std::sync::Arc;

use advisor_context::ContextAssembler;
use advisor_core::LlmProvider;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Market cache, vector store and turn log behind one facade
    pub assembler: Arc<ContextAssembler>,

    /// Model used when a chat request names none
    pub default_model: String,
}
