//! Conversational question answering on top of [`RagSystem`]

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::memory::{ChatTranscript, PersistentChatMemory};
use crate::rag::RagSystem;
use crate::types::{ChatRequest, ChatResponse, Citation, HistoryResponse};

/// Answers questions, remembering the conversation
pub struct ChatService {
    rag: Arc<RagSystem>,
    memory: Arc<PersistentChatMemory>,
    transcript: Arc<ChatTranscript>,
}

impl ChatService {
    pub fn new(
        rag: Arc<RagSystem>,
        memory: Arc<PersistentChatMemory>,
        transcript: Arc<ChatTranscript>,
    ) -> Self {
        Self {
            rag,
            memory,
            transcript,
        }
    }

    /// Build the whole stack from configuration
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let memory = PersistentChatMemory::open(&config.storage.memory_path)?;
        let transcript = ChatTranscript::new(&config.storage.transcript_path);
        let rag = RagSystem::from_config(config)?;
        Ok(Self::new(Arc::new(rag), Arc::new(memory), Arc::new(transcript)))
    }

    pub fn rag(&self) -> &Arc<RagSystem> {
        &self.rag
    }

    /// Answer a question from the loaded documents and the conversation so far
    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        let (params, k) = request.resolve(self.rag.config())?;
        let question = request.question.trim();

        let results = self.rag.query(question, k).await?;

        let context = PromptBuilder::build_context(&results);
        let chat_history = self.memory.load_memory_variables();
        let template = &self.rag.config().prompt.template;
        let prompt = PromptBuilder::render(template, &context, &chat_history, question);

        let answer = self.rag.generate(&prompt, &params).await?;
        if answer.trim().is_empty() {
            return Err(Error::llm("model returned an empty answer"));
        }

        self.remember(question, &answer).await;

        let terms: Vec<&str> = question.split_whitespace().collect();
        let citations = results
            .iter()
            .map(|r| {
                let mut citation = Citation::from_chunk(&r.chunk, r.similarity);
                citation.highlight_terms(&terms);
                citation
            })
            .collect();

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Answered in {}ms from {} chunks",
            processing_time_ms,
            results.len()
        );

        Ok(ChatResponse {
            answer,
            citations,
            chunks_retrieved: results.len(),
            processing_time_ms,
        })
    }

    /// Persist the exchange to memory and the transcript
    ///
    /// A memory write failure is logged; the answer is still returned.
    async fn remember(&self, question: &str, answer: &str) {
        let memory = self.memory.clone();
        let transcript = self.transcript.clone();
        let question = question.to_string();
        let answer = answer.to_string();

        let saved = tokio::task::spawn_blocking(move || {
            let result = memory.save_context(&question, &answer);
            transcript.append(&question, &answer);
            result
        })
        .await;

        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Failed to save chat memory: {}", e),
            Err(e) => tracing::error!("Chat memory task failed: {}", e),
        }
    }

    /// Conversation so far
    pub fn history(&self) -> HistoryResponse {
        HistoryResponse::from_messages(&self.memory.messages())
    }

    /// Forget the conversation
    pub async fn clear_memory(&self) -> Result<()> {
        let memory = self.memory.clone();
        tokio::task::spawn_blocking(move || memory.clear())
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parser::test_pdf;
    use crate::providers::testing::{HashEmbedder, RecordingLlm};
    use crate::providers::LocalVectorStore;
    use std::path::Path;

    struct Fixture {
        chat: ChatService,
        llm: Arc<RecordingLlm>,
        transcript: Arc<ChatTranscript>,
    }

    fn fixture(dir: &Path) -> Fixture {
        fixture_with(dir, RagConfig::default())
    }

    fn fixture_with(dir: &Path, mut config: RagConfig) -> Fixture {
        config.storage.vector_dir = dir.join("vectors");
        let llm = Arc::new(RecordingLlm::answering("Refunds are accepted within 30 days."));
        let store = LocalVectorStore::from_config(&config.storage).unwrap();
        let rag = RagSystem::new(
            config,
            Arc::new(HashEmbedder::default()),
            llm.clone(),
            Arc::new(store),
        );
        let memory = PersistentChatMemory::open(dir.join("chat_memory.json")).unwrap();
        let transcript = Arc::new(ChatTranscript::new(dir.join("chat_backup.json")));
        Fixture {
            chat: ChatService::new(Arc::new(rag), Arc::new(memory), transcript.clone()),
            llm,
            transcript,
        }
    }

    async fn load_policy(chat: &ChatService) {
        let pdf = test_pdf::build(&[
            "Refund requests are accepted within thirty days",
            "Shipping takes five business days",
        ]);
        chat.rag().process_pdf("policy.pdf", pdf).await.unwrap();
    }

    #[tokio::test]
    async fn test_ask_without_documents() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        let err = f.chat.ask(&ChatRequest::new("What about refunds?")).await.unwrap_err();
        assert!(matches!(err, Error::NoDocuments));
        assert!(f.chat.history().messages.is_empty());
    }

    #[tokio::test]
    async fn test_ask_builds_prompt_and_remembers() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        load_policy(&f.chat).await;

        let response = f.chat.ask(&ChatRequest::new("What about refund requests?")).await.unwrap();
        assert_eq!(response.answer, "Refunds are accepted within 30 days.");
        assert_eq!(response.chunks_retrieved, 2);
        assert_eq!(response.citations[0].page_number, 1);
        assert!(response.citations[0]
            .snippet_highlighted
            .contains("<mark>Refund</mark>"));

        let prompt = f.llm.last_prompt().unwrap();
        assert!(prompt.starts_with("Answer based on this context:\nRefund requests"));
        assert!(prompt.contains("Chat history:\n\n"));
        assert!(prompt.ends_with("Question: What about refund requests?\nAnswer:"));

        let history = f.chat.history();
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[0].role, "user");
        assert_eq!(history.messages[1].role, "assistant");
        assert_eq!(f.transcript.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_follow_up_sees_history() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        load_policy(&f.chat).await;

        f.chat.ask(&ChatRequest::new("What about refunds?")).await.unwrap();
        f.chat.ask(&ChatRequest::new("And shipping?")).await.unwrap();

        let prompt = f.llm.last_prompt().unwrap();
        assert!(prompt.contains(
            "Chat history:\nHuman: What about refunds?\nAI: Refunds are accepted within 30 days.\n\n"
        ));
    }

    #[tokio::test]
    async fn test_configured_template_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.prompt.template = "Contexto:\n{context}\n\nPregunta: {input}\nRespuesta:".to_string();
        let f = fixture_with(dir.path(), config);
        load_policy(&f.chat).await;

        f.chat.ask(&ChatRequest::new("shipping days?")).await.unwrap();
        let prompt = f.llm.last_prompt().unwrap();
        assert!(prompt.starts_with("Contexto:\nShipping takes five business days"));
        assert!(prompt.ends_with("Pregunta: shipping days?\nRespuesta:"));
    }

    #[tokio::test]
    async fn test_request_overrides_reach_llm() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        load_policy(&f.chat).await;

        let request = ChatRequest {
            question: "shipping".into(),
            temperature: Some(0.2),
            top_k: Some(5),
            k: Some(1),
            ..Default::default()
        };
        let response = f.chat.ask(&request).await.unwrap();
        assert_eq!(response.chunks_retrieved, 1);

        let (_, params) = f.llm.prompts.lock().last().cloned().unwrap();
        assert!((params.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(params.top_k, 5);
        assert!((params.top_p - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_invalid_params_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        load_policy(&f.chat).await;

        let request = ChatRequest {
            question: "shipping".into(),
            temperature: Some(3.0),
            ..Default::default()
        };
        assert!(matches!(f.chat.ask(&request).await, Err(Error::InvalidRequest(_))));
        assert!(f.llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_clear_memory() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path());
        load_policy(&f.chat).await;
        f.chat.ask(&ChatRequest::new("refunds?")).await.unwrap();

        f.chat.clear_memory().await.unwrap();
        assert!(f.chat.history().messages.is_empty());
        assert!(!dir.path().join("chat_memory.json").exists());
        // the transcript is a backup and keeps everything
        assert_eq!(f.transcript.entries().len(), 2);
    }
}
