//! Configuration for the PDF chat system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generation::prompt::DEFAULT_PROMPT_TEMPLATE;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Where documents, vectors and chat memory live
    pub storage: StorageConfig,
    /// Text chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Default sampling parameters
    pub generation: GenerationParams,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Chat prompt template
    pub prompt: PromptConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
                })?;
                let config: RagConfig = toml::from_str(&raw).map_err(|e| {
                    Error::Config(format!("Invalid config file {}: {}", path.display(), e))
                })?;
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            None => RagConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from a key lookup (environment variables in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PDF_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PDF_RAG_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PDF_RAG_PORT is not a valid port: {}", port)))?;
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("PDF_RAG_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = lookup("PDF_RAG_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(dir) = lookup("PDF_RAG_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("PDF_RAG_VECTOR_DIR") {
            self.storage.vector_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("PDF_RAG_MEMORY_PATH") {
            self.storage.memory_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Check invariants that the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be greater than 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.chunking.separators.is_empty() {
            return Err(Error::Config("chunking.separators must not be empty".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".into()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be at least 1".into()));
        }
        for required in ["{context}", "{input}"] {
            if !self.prompt.template.contains(required) {
                return Err(Error::Config(format!(
                    "prompt.template must contain {}",
                    required
                )));
            }
        }
        self.generation
            .validate()
            .map_err(|e| Error::Config(format!("generation: {}", e)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Filesystem layout, relative to the working directory by default
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for uploaded PDFs
    pub data_dir: PathBuf,
    /// Directory holding the persistent vector collection
    pub vector_dir: PathBuf,
    /// Collection name inside `vector_dir`
    pub collection: String,
    /// Conversation memory file
    pub memory_path: PathBuf,
    /// Append-only transcript backup
    pub transcript_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            vector_dir: PathBuf::from("chroma_db"),
            collection: "pdf_documents".to_string(),
            memory_path: PathBuf::from("chat_memory.json"),
            transcript_path: PathBuf::from("chat_backup.json"),
        }
    }
}

impl StorageConfig {
    /// Where an uploaded PDF is written before ingestion
    pub fn upload_path(&self) -> PathBuf {
        self.data_dir.join("document.pdf")
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Separators tried in order, coarsest first
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama embedding model
    pub model: String,
    /// L2-normalize vectors before storage
    pub normalize: bool,
    /// Number of chunks embedded per batch (progress granularity)
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            normalize: true,
            batch_size: 16,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Sampling parameters passed to the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Temperature, 0.0 - 1.0
    pub temperature: f32,
    /// Nucleus sampling, 0.1 - 1.0
    pub top_p: f32,
    /// Top-K sampling, 1 - 100
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
        }
    }
}

impl GenerationParams {
    /// Reject values outside the supported ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::invalid(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }
        if !(0.1..=1.0).contains(&self.top_p) {
            return Err(Error::invalid(format!(
                "top_p must be between 0.1 and 1.0, got {}",
                self.top_p
            )));
        }
        if !(1..=100).contains(&self.top_k) {
            return Err(Error::invalid(format!(
                "top_k must be between 1 and 100, got {}",
                self.top_k
            )));
        }
        Ok(())
    }

    /// Override individual fields, keeping the rest
    pub fn with_overrides(
        mut self,
        temperature: Option<f32>,
        top_p: Option<f32>,
        top_k: Option<u32>,
    ) -> Self {
        if let Some(t) = temperature {
            self.temperature = t;
        }
        if let Some(p) = top_p {
            self.top_p = p;
        }
        if let Some(k) = top_k {
            self.top_k = k;
        }
        self
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks stuffed into the prompt
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Template with `{context}`, `{chat_history}` and `{input}` placeholders
    pub template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.storage.collection, "pdf_documents");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nmodel = \"mistral\"\n\n[chunking]\nchunk_size = 400").unwrap();

        let config = RagConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 100);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = RagConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PDF_RAG_PORT", "9000"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434/"),
            ("PDF_RAG_LLM_MODEL", "llama3:70b"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.model, "llama3:70b");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = RagConfig::default();
        let result = config.apply_overrides(|k| (k == "PDF_RAG_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 800;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prompt_template_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[prompt]\ntemplate = \"\"\"\nResponde basado en este contexto:\n{{context}}\n\nPregunta: {{input}}\n\"\"\""
        )
        .unwrap();

        let config = RagConfig::load(Some(file.path())).unwrap();
        assert!(config.prompt.template.starts_with("Responde basado"));
        assert!(config.prompt.template.contains("{input}"));
    }

    #[test]
    fn test_prompt_template_needs_placeholders() {
        let mut config = RagConfig::default();
        config.prompt.template = "Context: {context}".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_generation_ranges() {
        let params = GenerationParams::default();
        assert!(params.validate().is_ok());
        assert!(params.with_overrides(Some(1.5), None, None).validate().is_err());
        assert!(params.with_overrides(None, Some(0.05), None).validate().is_err());
        assert!(params.with_overrides(None, None, Some(0)).validate().is_err());
        assert!(params.with_overrides(None, None, Some(101)).validate().is_err());
        assert!(params
            .with_overrides(Some(0.0), Some(1.0), Some(100))
            .validate()
            .is_ok());
    }
}
