//! Ollama Backends
//!
//! `LlmProvider` and `Embedder` implementations for local Ollama inference.

use std::time::Duration;

use advisor_core::{
    Embedder, EmbeddingError,
    error::{CoreError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
        embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest},
    },
    models::ModelOptions,
};

/// nomic-embed-text output size
pub const DEFAULT_EMBED_DIMENSIONS: usize = 768;

/// Ollama connection and model configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Model used for chat completions
    pub chat_model: String,

    /// Model used for embeddings
    pub embed_model: String,

    /// Output size of `embed_model`
    pub embed_dimensions: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
            chat_model: "llama3.2".into(),
            embed_model: "nomic-embed-text".into(),
            embed_dimensions: DEFAULT_EMBED_DIMENSIONS,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("OLLAMA_HOST").unwrap_or(defaults.host),
            port: lookup("OLLAMA_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            timeout_secs: lookup("OLLAMA_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            chat_model: lookup("OLLAMA_CHAT_MODEL").unwrap_or(defaults.chat_model),
            embed_model: lookup("OLLAMA_EMBED_MODEL").unwrap_or(defaults.embed_model),
            embed_dimensions: lookup("ADVISOR_EMBEDDING_DIMENSIONS")
                .and_then(|d| d.parse().ok())
                .unwrap_or(defaults.embed_dimensions),
        }
    }

    fn client(&self) -> Ollama {
        Ollama::new(&self.host, self.port)
    }

    const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ollama chat provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: config.client(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Options preset with the configured chat model
    pub fn default_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.config.chat_model.clone(),
            ..GenerationOptions::default()
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    fn convert_completion(response: ChatMessageResponse, model: &str) -> Completion {
        Completion {
            content: response.message.content,
            model: model.to_string(),
            usage: response.final_data.as_ref().map(|d| {
                let prompt_tokens = u32::try_from(d.prompt_eval_count).unwrap_or(u32::MAX);
                let completion_tokens = u32::try_from(d.eval_count).unwrap_or(u32::MAX);
                TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens.saturating_add(completion_tokens),
                }
            }),
            finish_reason: Some(FinishReason::Stop),
        }
    }

    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let request = ChatMessageRequest::new(options.model.clone(), Self::convert_messages(messages))
            .options(Self::build_options(options));

        let response = tokio::time::timeout(self.config.timeout(), self.client.send_chat_messages(request))
            .await
            .map_err(|_| CoreError::ProviderUnavailable(format!("no reply within {}s", self.config.timeout_secs)))?
            .map_err(|e| CoreError::Provider(e.to_string()))?;

        Ok(Self::convert_completion(response, &options.model))
    }
}

/// Ollama embedding backend
pub struct OllamaEmbedder {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaEmbedder {
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: config.client(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let request = GenerateEmbeddingsRequest::new(
            self.config.embed_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );

        let response = tokio::time::timeout(self.config.timeout(), self.client.generate_embeddings(request))
            .await
            .map_err(|_| EmbeddingError::Unavailable(format!("no reply within {}s", self.config.timeout_secs)))?
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Unavailable("empty embeddings response".into()))?;

        if vector.len() != self.config.embed_dimensions {
            return Err(EmbeddingError::Dimensions {
                expected: self.config.embed_dimensions,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.config.embed_dimensions
    }

    fn name(&self) -> &str {
        &self.config.embed_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.embed_model, "nomic-embed-text");
        assert_eq!(config.embed_dimensions, 768);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OLLAMA_HOST", "http://ollama"),
            ("OLLAMA_PORT", "not-a-port"),
            ("OLLAMA_CHAT_MODEL", "mistral"),
            ("ADVISOR_EMBEDDING_DIMENSIONS", "384"),
        ]);
        let config = OllamaConfig::from_lookup(|k| vars.get(k).map(ToString::to_string));

        assert_eq!(config.host, "http://ollama");
        assert_eq!(config.port, 11434);
        assert_eq!(config.chat_model, "mistral");
        assert_eq!(config.embed_dimensions, 384);
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are a retirement advisor."),
            Message::user("Hello"),
            Message::assistant("Hi there"),
        ];

        let converted = OllamaProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[2].content, "Hi there");
    }

    #[test]
    fn test_build_options_maps_generation_settings() {
        let options = GenerationOptions {
            max_tokens: 512,
            ..GenerationOptions::default()
        };
        let serialized = serde_json::to_value(OllamaProvider::build_options(&options)).unwrap();

        assert_eq!(serialized["num_predict"], 512);
        assert!((serialized["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((serialized["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_default_options_use_chat_model() {
        let provider = OllamaProvider::from_config(OllamaConfig {
            chat_model: "mistral".into(),
            ..OllamaConfig::default()
        });
        assert_eq!(provider.default_options().model, "mistral");
    }

    #[tokio::test]
    async fn test_unreachable_embedder_reports_unavailable() {
        let embedder = OllamaEmbedder::from_config(OllamaConfig {
            // Nothing listens on the discard port
            port: 9,
            host: "http://127.0.0.1".into(),
            timeout_secs: 5,
            ..OllamaConfig::default()
        });
        let result = embedder.embed("hello").await;
        assert!(matches!(result, Err(EmbeddingError::Unavailable(_))));
    }
}
