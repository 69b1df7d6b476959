//! In-process fakes for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::GenerationParams;
use crate::error::Result;

use super::{EmbeddingProvider, LlmProvider};

/// Deterministic bag-of-words embedder
///
/// Each lowercase word is hashed into one of `dims` buckets, so texts that
/// share words end up close in cosine space.
pub struct HashEmbedder {
    pub dims: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dims: 4096 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % self.dims] += 1.0;
        }
        Ok(v)
    }

    fn model(&self) -> &str {
        "hash"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// LLM that answers with a fixed string and records every prompt
#[derive(Default)]
pub struct RecordingLlm {
    pub answer: String,
    pub prompts: Mutex<Vec<(String, GenerationParams)>>,
}

impl RecordingLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().map(|(p, _)| p.clone())
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.prompts.lock().push((prompt.to_string(), *params));
        Ok(self.answer.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording"
    }
}
