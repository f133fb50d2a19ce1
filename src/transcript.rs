//! Where matches and traversed nodes get reported.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ChatError,
    matcher::Provenance,
    node::DialogueNode,
};

/// One resolved (or unresolved) match.
#[derive(Debug, Clone, Copy)]
pub struct MatchEvent<'a> {
    pub utterance: &'a str,
    pub node_name: &'a str,
    pub provenance: &'a Provenance,
}

/// Receives per-turn events from matchers and chat sessions.
pub trait ChatLog: Send + Sync {
    fn record_match(&self, event: &MatchEvent<'_>);

    /// Called whenever a node is appended to a session's history.
    fn record_node(&self, _node: &DialogueNode, _content: &str) {}
}

/// Forwards events to the `log` facade and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceLog;

impl ChatLog for TraceLog {
    fn record_match(&self, event: &MatchEvent<'_>) {
        info!("{:?} -> {} ({})", event.utterance, event.node_name, event.provenance);
    }

    fn record_node(&self, node: &DialogueNode, content: &str) {
        debug!("[{}] {}: {}", node.kind, node.name, content);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TranscriptEntry {
    Chat {
        name: String,
        #[serde(rename = "type")]
        node_type: String,
        content: String,
    },
    Semantic {
        req: String,
        name: String,
        info: String,
    },
}

/// In-memory conversation log, optionally mirrored to a JSON file after every entry.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Mutex<Vec<TranscriptEntry>>,
    path: Option<PathBuf>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript backed by `path`, truncating the file to an empty log.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self, ChatError> {
        let transcript = Self {
            entries: Mutex::new(Vec::new()),
            path: Some(path.into()),
        };
        transcript.persist()?;
        Ok(transcript)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TranscriptEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.lock().clone()
    }

    /// Match events only.
    pub fn semantic_entries(&self) -> Vec<TranscriptEntry> {
        self.lock()
            .iter()
            .filter(|entry| matches!(entry, TranscriptEntry::Semantic { .. }))
            .cloned()
            .collect()
    }

    /// Writes the whole log to the backing file, if any.
    pub fn persist(&self) -> Result<(), ChatError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&*self.lock())?;
        fs::write(path, json)?;
        Ok(())
    }

    fn push(&self, entry: TranscriptEntry) {
        self.lock().push(entry);
        if let Err(e) = self.persist() {
            warn!("Could not persist transcript: {}", e);
        }
    }
}

impl ChatLog for Transcript {
    fn record_match(&self, event: &MatchEvent<'_>) {
        debug!("[LOG] {:?} -> {} ({})", event.utterance, event.node_name, event.provenance);
        self.push(TranscriptEntry::Semantic {
            req: event.utterance.to_string(),
            name: event.node_name.to_string(),
            info: event.provenance.to_string(),
        });
    }

    fn record_node(&self, node: &DialogueNode, content: &str) {
        self.push(TranscriptEntry::Chat {
            name: node.name.clone(),
            node_type: node.kind.code().to_string(),
            content: content.to_string(),
        });
    }
}

/// A support ticket assembled from the inputs a user gave during a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub email: String,
    /// `name: value` lines for every captured input, in conversation order.
    pub content: String,
}
