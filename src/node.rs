use std::collections::HashMap;
use std::fmt;

use crate::errors::ChatError;

/// What a node does in the conversation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic wrapper that seeds the first turn. Never loaded from data.
    Root,
    /// A bot line. Always a forced next step.
    Output,
    /// A free-text slot; whatever the user types is captured.
    Input,
    /// A user choice, with `;`-separated keywords as content.
    Choice,
}

impl NodeKind {
    /// Parses the type column of a node table.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "o" | "output" => Some(Self::Output),
            "i" | "input" => Some(Self::Input),
            "c" | "choice" => Some(Self::Choice),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Output => "o",
            Self::Input => "i",
            Self::Choice => "c",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub content: String,
    pub children: Vec<NodeId>,
}

impl DialogueNode {
    fn new(id: NodeId, name: String, kind: NodeKind, content: String) -> Self {
        Self {
            id,
            name,
            kind,
            content,
            children: Vec::new(),
        }
    }

    pub fn is_output(&self) -> bool {
        self.kind == NodeKind::Output
    }

    /// Non-empty, trimmed keywords of the node's content.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.content
            .split(';')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
    }
}

/// The dialogue graph. Owns every node; children are ids into the same arena.
///
/// Slot 0 always holds the root wrapper (empty name, empty content) whose only child is the
/// start node. Cycles are not rejected.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<DialogueNode>,
    names: HashMap<String, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        let root = DialogueNode::new(NodeId(0), String::new(), NodeKind::Root, String::new());
        Self {
            nodes: vec![root],
            names: HashMap::new(),
        }
    }

    /// Adds a node and returns its id. Names must be unique and non-empty.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        content: impl Into<String>,
    ) -> Result<NodeId, ChatError> {
        let name = name.into();
        if name.is_empty() || self.names.contains_key(&name) {
            return Err(ChatError::DuplicateNode(name));
        }

        let id = NodeId(self.nodes.len());
        self.names.insert(name.clone(), id);
        self.nodes.push(DialogueNode::new(id, name, kind, content.into()));
        Ok(id)
    }

    /// Appends `child` to `parent`'s children and returns `child`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        self.nodes[parent.0].children.push(child);
        child
    }

    /// Makes `start` the sole child of the root wrapper.
    pub fn set_start(&mut self, start: NodeId) {
        self.nodes[0].children = vec![start];
    }

    pub fn set_start_by_name(&mut self, name: &str) -> Result<NodeId, ChatError> {
        let start = self.id_of(name)
            .ok_or_else(|| ChatError::MissingStart(name.to_string()))?;
        self.set_start(start);
        Ok(start)
    }

    pub fn root(&self) -> &DialogueNode {
        &self.nodes[0]
    }

    pub fn start(&self) -> Option<&DialogueNode> {
        self.root().children.first().map(|&id| self.node(id))
    }

    pub fn node(&self, id: NodeId) -> &DialogueNode {
        &self.nodes[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&DialogueNode> {
        self.id_of(name).map(|id| self.node(id))
    }

    pub fn children(&self, node: &DialogueNode) -> Vec<&DialogueNode> {
        node.children.iter().map(|&id| self.node(id)).collect()
    }

    /// Loaded nodes, root wrapper excluded, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DialogueNode> {
        self.nodes.iter().skip(1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
