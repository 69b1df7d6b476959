//! Conversation memory and transcript backup

pub mod persistent;
pub mod transcript;

pub use persistent::PersistentChatMemory;
pub use transcript::{ChatTranscript, TranscriptEntry};
