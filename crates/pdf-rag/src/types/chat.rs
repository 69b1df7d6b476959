//! Conversation messages

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions
    Human,
    /// The model
    Ai,
}

impl Role {
    /// Parse the persisted type tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "human" => Some(Self::Human),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }

    /// Persisted type tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }

    /// Role name used by chat frontends
    pub fn display_role(&self) -> &'static str {
        match self {
            Self::Human => "user",
            Self::Ai => "assistant",
        }
    }

    /// Speaker prefix used when rendering history into a prompt
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Ai => "AI",
        }
    }
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}
