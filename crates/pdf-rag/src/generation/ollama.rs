//! Ollama API client for embeddings and generation with retry logic

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{GenerationParams, LlmConfig};
use crate::error::{Error, Result};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Generation model
    model: String,
    /// Embedding model
    embed_model: String,
    /// Maximum retries
    max_retries: u32,
    /// First backoff delay, doubled on every retry
    base_delay: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig, embed_model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embed_model: embed_model.into(),
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Generation model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embedding model name
    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    /// Base URL of the Ollama server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = self.base_delay * 2u32.pow(attempt);
                        tracing::warn!(
                            "Request failed (attempt {}/{}): {}, retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    /// POST a JSON body and decode the JSON answer, mapping failures to `Llm`
    async fn post_json<Req, Resp>(&self, path: &str, body: &Req, what: &str) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        let client = &self.client;

        self.retry_request(move || async move {
            let response = client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| Error::llm(format!("{} request failed: {}", what, e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                return Err(Error::llm(format!(
                    "{} failed: HTTP {} - {}",
                    what, status, detail
                )));
            }

            response
                .json::<Resp>()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse {} response: {}", what, e)))
        })
        .await
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Names of the models pulled on the server
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Cannot reach Ollama at {}: {}", self.base_url, e)))?;

        if !response.status().is_success() {
            return Err(Error::llm(format!(
                "Listing models failed: HTTP {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.embed_model,
            prompt: text,
        };

        let response: EmbedResponse = self
            .post_json("/api/embeddings", &request, "Embedding")
            .await?;

        if response.embedding.is_empty() {
            return Err(Error::embedding(format!(
                "Model '{}' returned an empty embedding",
                self.embed_model
            )));
        }

        Ok(response.embedding)
    }

    /// Complete a prompt with the generation model
    pub async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        tracing::info!(
            "Generating answer with model: {} (temperature={}, top_p={}, top_k={})",
            self.model,
            params.temperature,
            params.top_p,
            params.top_k
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
            },
        };

        let response: GenerateResponse = self
            .post_json("/api/generate", &request, "Generation")
            .await?;

        Ok(response.response.trim().to_string())
    }
}

/// Scale a vector to unit length in place; zero vectors are left alone
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
