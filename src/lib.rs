//! A scripted chatbot that walks a dialogue graph one user utterance at a time.
//!
//! Each turn is resolved against the current candidate nodes by keyword, and, when a
//! word-vector model is available, by soft cosine similarity.

pub use crate::{
    chat::{Chat, START},
    embeddings::{EmbeddingProvider, WordVectors},
    errors::ChatError,
    matcher::{
        MatchPolicy,
        MatchResult,
        Matched,
        Matcher,
        MatcherHandle,
        Provenance,
        SemanticMatcher,
        SoftCosineMatcher,
        StringMatcher,
        DEFAULT_CONFIDENCE_THRESHOLD,
    },
    node::{DialogueNode, Graph, NodeId, NodeKind},
    transcript::{ChatLog, MatchEvent, Ticket, TraceLog, Transcript, TranscriptEntry},
};

pub mod graph_proto {
    include!(concat!(env!("OUT_DIR"), "/chatgraph.rs"));
}

mod chat;
pub mod config;
mod embeddings;
mod errors;
pub mod loader;
mod matcher;
mod node;
pub mod similarity;
pub mod tokenizer;
mod transcript;
pub mod visualize;
