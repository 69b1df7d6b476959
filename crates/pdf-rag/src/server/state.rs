//! Application state for the HTTP server

use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::RagConfig;
use crate::error::Result;
use crate::rag::RagSystem;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    chat: ChatService,
}

impl AppState {
    /// Build the RAG stack from configuration
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");
        let chat = ChatService::from_config(config.clone())?;
        Ok(Self::from_service(config, chat))
    }

    /// Wrap an already built chat service
    pub fn from_service(config: RagConfig, chat: ChatService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, chat }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn chat(&self) -> &ChatService {
        &self.inner.chat
    }

    pub fn rag(&self) -> &Arc<RagSystem> {
        self.inner.chat.rag()
    }
}
