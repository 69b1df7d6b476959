//! LLM provider trait for generating answers

use async_trait::async_trait;

use crate::config::GenerationParams;
use crate::error::Result;

/// Trait for completing a fully rendered prompt
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3, mistral, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion with the given sampling parameters
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
