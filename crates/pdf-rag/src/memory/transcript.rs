//! Append-only backup of every exchange
//!
//! Independent of the conversation memory so a broken memory file never
//! loses the record of what was asked. Failures are logged and swallowed.
//! An existing file that cannot be parsed is left alone rather than
//! overwritten.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One transcript line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub timestamp: String,
}

/// Transcript file writer
pub struct ChatTranscript {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ChatTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a question and its answer
    pub fn append(&self, question: &str, answer: &str) {
        if let Err(e) = self.try_append(question, answer) {
            tracing::error!("Transcript backup to {} failed: {}", self.path.display(), e);
        }
    }

    fn try_append(&self, question: &str, answer: &str) -> Result<()> {
        let _guard = self.lock.lock();

        let mut entries = self.read_entries()?;
        let now = chrono::Utc::now().to_rfc3339();
        entries.push(TranscriptEntry {
            kind: "human".to_string(),
            content: question.to_string(),
            timestamp: now.clone(),
        });
        entries.push(TranscriptEntry {
            kind: "ai".to_string(),
            content: answer.to_string(),
            timestamp: now,
        });

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    /// Everything recorded so far
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        let _guard = self.lock.lock();
        self.read_entries().unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Vec::new()
        })
    }

    fn read_entries(&self) -> Result<Vec<TranscriptEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::memory(format!(
                "Unreadable transcript at {}, leaving it untouched: {}",
                self.path.display(),
                e
            ))
        })
    }
}
