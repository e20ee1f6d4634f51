//! Append-only turn history, one JSON line per turn.
//!
//! Stored in `{history_dir}/{user}.jsonl`. Records are never rewritten or
//! deleted here.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LucyError, Result};

use super::sanitize_user_id;

/// How the user spoke to Lucy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    /// Typed input.
    Text,
    /// Spoken input, transcribed by ASR.
    Voice,
}

/// One completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Unix time in seconds.
    #[serde(alias = "ts")]
    pub timestamp: f64,
    /// Session user the turn belongs to.
    #[serde(alias = "session_user")]
    pub user_id: String,
    /// Text or voice.
    pub kind: TurnKind,
    /// Backend name that produced the reply.
    #[serde(default, alias = "llm_provider")]
    pub provider: String,
    /// Model name, empty when the backend default was used.
    #[serde(default, alias = "ollama_model")]
    pub model_name: String,
    /// Raw user text (empty for voice turns).
    #[serde(default)]
    pub user_text: String,
    /// Text the turn was processed with: the input for text turns, the
    /// transcription for voice turns.
    #[serde(default)]
    pub transcript: String,
    /// Final reply.
    #[serde(default)]
    pub reply: String,
}

impl HistoryItem {
    /// The user side of the turn as it should appear in a prompt.
    pub fn user_content(&self) -> &str {
        if self.transcript.is_empty() {
            &self.user_text
        } else {
            &self.transcript
        }
    }

    /// Current Unix time in seconds.
    pub fn now_timestamp() -> f64 {
        let now = chrono::Utc::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0
    }
}

/// Durable append-only history.
pub trait HistoryStore: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn append(&self, item: &HistoryItem) -> Result<()>;

    /// The most recent `limit` records for `user_id`, oldest first.
    /// Unparseable lines are skipped.
    fn read(&self, user_id: &str, limit: usize) -> Vec<HistoryItem>;
}

/// JSONL-file history store.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    root: PathBuf,
}

impl FileHistoryStore {
    /// Open a store rooted at `root`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory holding history files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", sanitize_user_id(user_id)))
    }
}

impl HistoryStore for FileHistoryStore {
    fn append(&self, item: &HistoryItem) -> Result<()> {
        let line = serde_json::to_string(item)
            .map_err(|e| LucyError::Memory(format!("failed to serialize history: {e}")))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(&item.user_id))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn read(&self, user_id: &str, limit: usize) -> Vec<HistoryItem> {
        let path = self.path_for(user_id);
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!(user = user_id, error = %e, "failed to read history");
                return Vec::new();
            }
        };
        let lines: Vec<&str> = body.lines().collect();
        let start = lines.len().saturating_sub(limit.max(1));
        lines[start..]
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}
