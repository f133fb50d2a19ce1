//! Runner configuration: an optional TOML file, overridden by the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    errors::ChatError,
    matcher::{MatchPolicy, DEFAULT_CONFIDENCE_THRESHOLD},
};

pub const GRAPH_PATH_VAR: &str = "CHAT_GRAPH_PATH";
pub const MODEL_PATH_VAR: &str = "GLOVE_MODEL_PATH";
pub const LOG_PATH_VAR: &str = "CHAT_LOG_PATH";
pub const LOG_DIR_VAR: &str = "LOG_DIR";

const TRANSCRIPT_FILE_NAME: &str = "chat_log.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfig {
    /// A `.graph` file, or the stem of `<stem>-Nodes.csv`/`<stem>-Edges.csv`.
    pub graph: PathBuf,
    pub start_node: String,
    /// Word vectors for semantic matching. Exact matching only when unset.
    pub embeddings: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub output_always_wins: bool,
    /// Candidate taken when nothing matches; the first candidate if absent.
    pub default_node: String,
    pub transcript: Option<PathBuf>,
    /// Input node whose capture opens a ticket at the end of a session.
    pub ticket_email_node: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            graph: PathBuf::from("data/bugland"),
            start_node: "start".to_string(),
            embeddings: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            output_always_wins: true,
            default_node: String::new(),
            transcript: None,
            ticket_email_node: None,
        }
    }
}

impl ChatConfig {
    pub fn from_toml(text: &str) -> Result<Self, ChatError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ChatError> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`. Set variables win over the file.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(graph) = lookup(GRAPH_PATH_VAR) {
            self.graph = PathBuf::from(graph);
        }
        if let Some(model) = lookup(MODEL_PATH_VAR) {
            self.embeddings = Some(PathBuf::from(model));
        }
        if let Some(log_path) = lookup(LOG_PATH_VAR) {
            self.transcript = Some(PathBuf::from(log_path));
        } else if let Some(log_dir) = lookup(LOG_DIR_VAR) {
            if self.transcript.is_none() {
                self.transcript = Some(Path::new(&log_dir).join(TRANSCRIPT_FILE_NAME));
            }
        }
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            confidence_threshold: self.confidence_threshold,
            output_always_wins: self.output_always_wins,
        }
    }
}

/// Path of a converted GloVe 6B model of the given dimension.
pub fn glove_path(root: &Path, dim: u16) -> PathBuf {
    root.join("glove.6B").join(format!("glove.6B.{}d.w2v.txt", dim))
}
