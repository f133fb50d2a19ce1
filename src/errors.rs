use std::io;

use thiserror::Error;

/// Errors raised while loading graphs, models and configuration, or while persisting logs.
///
/// Matching and traversal never produce these; they degrade instead.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A node or edge table could not be read
    #[error("could not read CSV table: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not decode compiled graph: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("could not encode compiled graph: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("could not serialize transcript: {0}")]
    Json(#[from] serde_json::Error),
    /// Node names must be unique across the graph
    #[error("node {0:?} is defined more than once")]
    DuplicateNode(String),
    /// An edge names a node that was never defined
    #[error("edge {from:?} -> {to:?} references unknown node {missing:?}")]
    MissingNode {
        from: String,
        to: String,
        missing: String,
    },
    #[error("start node {0:?} not found")]
    MissingStart(String),
    #[error("unknown type {kind:?} for node {name:?}")]
    UnknownKind {
        name: String,
        kind: String,
    },
    /// The word-vector file is not in word2vec/GloVe text format
    #[error("malformed embedding file at line {line}: {reason}")]
    Embeddings {
        line: usize,
        reason: String,
    },
}
