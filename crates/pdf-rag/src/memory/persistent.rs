//! Conversation buffer persisted to a JSON file
//!
//! The file holds an array of `{"type": "human"|"ai", "data": {"content": ...}}`
//! objects. The flat `{"type": ..., "content": ...}` form is accepted on load.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::types::{ChatMessage, Role};

#[derive(Serialize)]
struct StoredMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: StoredData<'a>,
}

#[derive(Serialize)]
struct StoredData<'a> {
    content: &'a str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Chat memory that survives restarts
pub struct PersistentChatMemory {
    path: PathBuf,
    messages: Mutex<Vec<ChatMessage>>,
}

impl PersistentChatMemory {
    /// Open the memory file, creating parent directories as needed
    ///
    /// A file that cannot be read as a JSON array is moved to `{path}.bak`
    /// and memory starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::memory(format!("Cannot create {}: {}", parent.display(), e)))?;
        }

        let messages = if path.exists() {
            match Self::load(&path) {
                Ok(messages) => {
                    tracing::info!("Loaded {} messages from {}", messages.len(), path.display());
                    messages
                }
                Err(e) => {
                    tracing::error!("Failed to load chat memory: {}", e);
                    Self::backup(&path);
                    Vec::new()
                }
            }
        } else {
            tracing::info!("No chat memory at {}, starting fresh", path.display());
            Vec::new()
        };

        Ok(Self {
            path,
            messages: Mutex::new(messages),
        })
    }

    fn load(path: &Path) -> Result<Vec<ChatMessage>> {
        let raw = std::fs::read_to_string(path)?;
        let data: Value = serde_json::from_str(&raw)?;
        let items = data
            .as_array()
            .ok_or_else(|| Error::memory("memory file must contain a JSON array"))?;

        Ok(items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| Self::parse_entry(idx + 1, item))
            .collect())
    }

    fn parse_entry(idx: usize, item: &Value) -> Option<ChatMessage> {
        let Some(obj) = item.as_object() else {
            tracing::warn!("Entry {}: not an object, skipping", idx);
            return None;
        };

        let content = obj
            .get("data")
            .and_then(|d| d.get("content"))
            .or_else(|| obj.get("content"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            tracing::warn!("Entry {}: message without content, skipping", idx);
            return None;
        }

        let kind = obj.get("type").and_then(Value::as_str).unwrap_or_default();
        let Some(role) = Role::from_tag(kind) else {
            tracing::warn!("Entry {}: unknown message type '{}', skipping", idx, kind);
            return None;
        };

        let mut message = match role {
            Role::Human => ChatMessage::human(content),
            Role::Ai => ChatMessage::ai(content),
        };
        if let Some(ts) = obj
            .get("data")
            .and_then(|d| d.get("timestamp"))
            .and_then(|t| serde_json::from_value(t.clone()).ok())
        {
            message.timestamp = ts;
        }
        Some(message)
    }

    fn backup(path: &Path) {
        let backup = with_suffix(path, ".bak");
        match std::fs::rename(path, &backup) {
            Ok(()) => tracing::warn!("Moved unreadable chat memory to {}", backup.display()),
            Err(e) => tracing::error!("Could not back up {}: {}", path.display(), e),
        }
    }

    /// Record one exchange and persist it
    pub fn save_context(&self, input: &str, output: &str) -> Result<()> {
        if input.trim().is_empty() || output.trim().is_empty() {
            return Err(Error::invalid("both input and output must be non-empty"));
        }

        let mut messages = self.messages.lock();
        messages.push(ChatMessage::human(input));
        messages.push(ChatMessage::ai(output));

        if let Err(e) = self.atomic_save(&messages) {
            // keep memory and file in step
            let keep = messages.len() - 2;
            messages.truncate(keep);
            return Err(e);
        }
        Ok(())
    }

    fn atomic_save(&self, messages: &[ChatMessage]) -> Result<()> {
        let stored: Vec<StoredMessage<'_>> = messages
            .iter()
            .filter(|m| !m.content.is_empty())
            .map(|m| StoredMessage {
                kind: m.role.tag(),
                data: StoredData {
                    content: &m.content,
                    timestamp: m.timestamp,
                },
            })
            .collect();
        let json = serde_json::to_string_pretty(&stored)?;

        let temp = with_suffix(&self.path, ".tmp");
        let result = std::fs::write(&temp, json).and_then(|()| std::fs::rename(&temp, &self.path));

        if let Err(e) = result {
            if temp.exists() {
                let _ = std::fs::remove_file(&temp);
            }
            return Err(Error::memory(format!(
                "Failed to save {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    /// All messages, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    /// Conversation rendered for the prompt's chat history slot
    pub fn load_memory_variables(&self) -> String {
        PromptBuilder::format_history(&self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Memory file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forget everything and delete the file
    pub fn clear(&self) -> Result<()> {
        let mut messages = self.messages.lock();
        messages.clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                Error::memory(format!("Failed to delete {}: {}", self.path.display(), e))
            })?;
        }
        tracing::info!("Chat memory cleared");
        Ok(())
    }
}
