//! Chat request types

use serde::{Deserialize, Serialize};

use crate::config::{GenerationParams, RagConfig};
use crate::error::{Error, Result};

/// A question for the chatbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,

    /// Sampling temperature (defaults to configuration)
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Nucleus sampling (defaults to configuration)
    #[serde(default)]
    pub top_p: Option<f32>,

    /// Top-K sampling (defaults to configuration)
    #[serde(default)]
    pub top_k: Option<u32>,

    /// Number of chunks to retrieve (defaults to configuration)
    #[serde(default)]
    pub k: Option<usize>,
}

impl ChatRequest {
    /// Create a request with default parameters
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Resolve against configured defaults and validate
    pub fn resolve(&self, config: &RagConfig) -> Result<(GenerationParams, usize)> {
        if self.question.trim().is_empty() {
            return Err(Error::invalid("question must not be empty"));
        }

        let params =
            config
                .generation
                .with_overrides(self.temperature, self.top_p, self.top_k);
        params.validate()?;

        let k = self.k.unwrap_or(config.retrieval.top_k);
        if k == 0 {
            return Err(Error::invalid("k must be at least 1"));
        }

        Ok((params, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_defaults() {
        let config = RagConfig::default();
        let (params, k) = ChatRequest::new("What is this about?").resolve(&config).unwrap();
        assert_eq!(params, config.generation);
        assert_eq!(k, 3);
    }

    #[test]
    fn test_resolve_overrides() {
        let config = RagConfig::default();
        let request: ChatRequest =
            serde_json::from_str(r#"{"question": "hi there", "temperature": 0.1, "k": 5}"#).unwrap();
        let (params, k) = request.resolve(&config).unwrap();
        assert!((params.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(params.top_k, 50);
        assert_eq!(k, 5);
    }

    #[test]
    fn test_resolve_rejects_blank_question() {
        let err = ChatRequest::new("   ").resolve(&RagConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        let request = ChatRequest {
            question: "q".into(),
            top_p: Some(2.0),
            ..Default::default()
        };
        assert!(request.resolve(&RagConfig::default()).is_err());
    }
}
