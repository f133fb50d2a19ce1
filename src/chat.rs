use std::collections::HashMap;
use std::sync::Arc;

use log::*;

use crate::{
    matcher::{MatchResult, MatcherHandle},
    node::{DialogueNode, Graph, NodeId, NodeKind},
    transcript::{ChatLog, Ticket},
};

/// Utterance that starts a session.
pub const START: &str = "";

/// One conversation over a shared, read-only graph.
///
/// The current candidates are always the children of the last matched node, or the root
/// wrapper before the first turn. An empty candidate list means the conversation is over.
pub struct Chat<'g> {
    graph: &'g Graph,
    matcher: MatcherHandle,
    log: Arc<dyn ChatLog>,
    default_node: String,

    current: Vec<NodeId>,
    history: Vec<NodeId>,
    /// Bot line to repeat when a turn can't be resolved.
    last_question: Option<NodeId>,
    /// What the user typed into Input nodes, by node name.
    captures: HashMap<String, String>,
}

impl<'g> Chat<'g> {
    pub fn new(graph: &'g Graph, matcher: MatcherHandle, log: Arc<dyn ChatLog>) -> Self {
        Self {
            graph,
            matcher,
            log,
            default_node: String::new(),
            current: vec![graph.root().id],
            history: Vec::new(),
            last_question: None,
            captures: HashMap::new(),
        }
    }

    /// Candidate to pick when nothing matches, by name.
    pub fn with_default(mut self, default_node: impl Into<String>) -> Self {
        self.default_node = default_node.into();
        self
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    fn nodes(&self, ids: &[NodeId]) -> Vec<&'g DialogueNode> {
        let graph = self.graph;
        ids.iter().map(|&id| graph.node(id)).collect()
    }

    /// Resolves `utterance` against the current candidates and moves on to the next ones.
    pub fn advance(&mut self, utterance: &str) -> Vec<&'g DialogueNode> {
        let candidates = self.nodes(&self.current);

        let matched = match self.matcher.resolve(utterance, &candidates, &self.default_node) {
            MatchResult::Matched(matched) => matched.node,
            MatchResult::Unresolved { best, score } => {
                debug!(
                    "Could not resolve {:?} (best {} at {:.4}), asking again",
                    utterance, best.name, score
                );
                if let Some(question) = self.last_question {
                    self.current = vec![question];
                }
                return self.current();
            }
            MatchResult::NoCandidates => {
                debug!("No candidates left for {:?}", utterance);
                return Vec::new();
            }
        };

        if matched.kind == NodeKind::Input {
            self.captures.insert(matched.name.clone(), utterance.to_string());
        }

        self.history.push(matched.id);
        self.log.record_node(matched, self.content_of(matched));

        self.current = matched.children.clone();
        if let Some(&first) = self.current.first() {
            if self.graph.node(first).is_output() {
                self.last_question = Some(first);
            }
        }

        debug!("Path taken: {}", self.path());
        if self.current.is_empty() {
            info!("Conversation finished at {}", matched.name);
        }

        self.current()
    }

    pub fn current(&self) -> Vec<&'g DialogueNode> {
        self.nodes(&self.current)
    }

    /// Every matched node, in order. Re-prompts are not recorded.
    pub fn history(&self) -> Vec<&'g DialogueNode> {
        self.nodes(&self.history)
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_empty()
    }

    pub fn last_question(&self) -> Option<&'g DialogueNode> {
        let graph = self.graph;
        self.last_question.map(|id| graph.node(id))
    }

    /// What the user typed for the named Input node, if it was reached.
    pub fn captured(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    /// The captured text for Input nodes, the graph content otherwise.
    pub fn content_of<'a>(&'a self, node: &'a DialogueNode) -> &'a str {
        match node.kind {
            NodeKind::Input => self.captured(&node.name).unwrap_or(node.content.as_str()),
            _ => &node.content,
        }
    }

    /// Captured inputs as `(node name, text)`, in conversation order.
    pub fn inputs(&self) -> Vec<(&str, &str)> {
        self.history()
            .into_iter()
            .filter(|node| node.kind == NodeKind::Input)
            .filter_map(|node| self.captured(&node.name).map(|text| (node.name.as_str(), text)))
            .collect()
    }

    /// A ticket, if the user reached and filled in `email_node`.
    pub fn ticket(&self, email_node: &str) -> Option<Ticket> {
        let email = self.captured(email_node)?.to_string();
        let content = self.inputs()
            .iter()
            .map(|(name, text)| format!("{}: {}", name, text))
            .collect::<Vec<_>>()
            .join("\n");
        Some(Ticket { email, content })
    }

    /// The traversal so far, e.g. `start -> produkt_cleanbug -> cleanbug_frage`.
    pub fn path(&self) -> String {
        self.history()
            .iter()
            .filter(|node| node.kind != NodeKind::Root)
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
