//! Ollama-based providers for embeddings and LLM
//!
//! Both wrap a shared [`OllamaClient`] to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{EmbeddingConfig, GenerationParams, LlmConfig};
use crate::error::Result;
use crate::generation::ollama::normalize;
use crate::generation::OllamaClient;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    normalize: bool,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder with its own client
    pub fn new(llm: &LlmConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(llm, embeddings.model.clone())?);
        Ok(Self::from_client(client, embeddings.normalize))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, normalize: bool) -> Self {
        Self { client, normalize }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = self.client.embed(text).await?;
        if self.normalize {
            normalize(&mut embedding);
        }
        Ok(embedding)
    }

    fn model(&self) -> &str {
        self.client.embed_model()
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.client.generate(prompt, params).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        self.client.model()
    }
}

/// Build an embedder and an LLM that share one HTTP client
pub fn ollama_providers(
    llm: &LlmConfig,
    embeddings: &EmbeddingConfig,
) -> Result<(OllamaEmbedder, OllamaLlm)> {
    let client = Arc::new(OllamaClient::new(llm, embeddings.model.clone())?);
    Ok((
        OllamaEmbedder::from_client(Arc::clone(&client), embeddings.normalize),
        OllamaLlm::from_client(client),
    ))
}
