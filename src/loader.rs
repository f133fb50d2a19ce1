//! Reads dialogue graphs from node/edge tables or from compiled protobuf files.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::*;
use prost::Message;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ChatError,
    graph_proto as proto,
    node::{Graph, NodeKind},
};

/// Extension of compiled graph files.
pub const COMPILED_EXTENSION: &str = "graph";

/// A row of the node table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub content: String,
}

/// A row of the edge table. Rows sharing `from_name` give the child order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EdgeRecord {
    pub from_name: String,
    pub to_name: String,
}

/// Builds a graph from node and edge records and roots it at `start`.
pub fn build_graph<N, E>(nodes: N, edges: E, start: &str) -> Result<Graph, ChatError>
where
    N: IntoIterator<Item = NodeRecord>,
    E: IntoIterator<Item = EdgeRecord>,
{
    let mut graph = Graph::new();
    for record in nodes {
        let kind = NodeKind::from_code(&record.node_type).ok_or_else(|| ChatError::UnknownKind {
            name: record.name.clone(),
            kind: record.node_type.clone(),
        })?;
        graph.add_node(record.name, kind, record.content)?;
    }

    for edge in edges {
        let missing = |name: &str| ChatError::MissingNode {
            from: edge.from_name.clone(),
            to: edge.to_name.clone(),
            missing: name.to_string(),
        };
        let from = graph.id_of(&edge.from_name).ok_or_else(|| missing(&edge.from_name))?;
        let to = graph.id_of(&edge.to_name).ok_or_else(|| missing(&edge.to_name))?;
        graph.add_child(from, to);
    }

    graph.set_start_by_name(start)?;
    Ok(graph)
}

pub fn from_csv_readers<N: Read, E: Read>(
    nodes: N,
    edges: E,
    start: &str,
) -> Result<Graph, ChatError> {
    let nodes: Vec<NodeRecord> = csv::Reader::from_reader(nodes)
        .deserialize()
        .collect::<Result<_, _>>()?;
    let edges: Vec<EdgeRecord> = csv::Reader::from_reader(edges)
        .deserialize()
        .collect::<Result<_, _>>()?;
    build_graph(nodes, edges, start)
}

/// `<stem>-Nodes.csv` and `<stem>-Edges.csv` next to each other.
pub fn csv_paths(stem: &Path) -> (PathBuf, PathBuf) {
    let file_stem = stem
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        stem.with_file_name(format!("{}-Nodes.csv", file_stem)),
        stem.with_file_name(format!("{}-Edges.csv", file_stem)),
    )
}

pub fn load_csv(stem: &Path, start: &str) -> Result<Graph, ChatError> {
    let (nodes_path, edges_path) = csv_paths(stem);
    let nodes = fs::File::open(&nodes_path)?;
    let edges = fs::File::open(&edges_path)?;
    let graph = from_csv_readers(nodes, edges, start)?;
    info!(
        "Loaded {} nodes from {} and {}",
        graph.len(),
        nodes_path.display(),
        edges_path.display()
    );
    Ok(graph)
}

fn kind_to_proto(kind: NodeKind) -> proto::node::Kind {
    match kind {
        NodeKind::Input => proto::node::Kind::Input,
        NodeKind::Choice => proto::node::Kind::Choice,
        NodeKind::Output | NodeKind::Root => proto::node::Kind::Output,
    }
}

fn kind_from_proto(name: &str, kind: i32) -> Result<NodeKind, ChatError> {
    match proto::node::Kind::from_i32(kind) {
        Some(proto::node::Kind::Output) => Ok(NodeKind::Output),
        Some(proto::node::Kind::Input) => Ok(NodeKind::Input),
        Some(proto::node::Kind::Choice) => Ok(NodeKind::Choice),
        None => Err(ChatError::UnknownKind {
            name: name.to_string(),
            kind: kind.to_string(),
        }),
    }
}

pub fn to_proto(graph: &Graph) -> proto::Graph {
    let nodes = graph
        .iter()
        .map(|node| proto::Node {
            name: node.name.clone(),
            kind: kind_to_proto(node.kind) as i32,
            content: node.content.clone(),
            children: graph.children(node).iter().map(|child| child.name.clone()).collect(),
        })
        .collect();

    proto::Graph {
        start: graph.start().map(|node| node.name.clone()).unwrap_or_default(),
        nodes,
    }
}

pub fn from_proto(compiled: proto::Graph) -> Result<Graph, ChatError> {
    let mut nodes = Vec::with_capacity(compiled.nodes.len());
    let mut edges = Vec::new();
    for node in compiled.nodes {
        let kind = kind_from_proto(&node.name, node.kind)?;
        let from_name = node.name.clone();
        edges.extend(node.children.into_iter().map(|child| EdgeRecord {
            from_name: from_name.clone(),
            to_name: child,
        }));
        nodes.push(NodeRecord {
            name: node.name,
            node_type: kind.code().to_string(),
            content: node.content,
        });
    }
    build_graph(nodes, edges, &compiled.start)
}

pub fn encode(graph: &Graph) -> Result<Vec<u8>, ChatError> {
    let compiled = to_proto(graph);
    let mut buf = Vec::with_capacity(compiled.encoded_len());
    compiled.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode(bytes: &[u8]) -> Result<Graph, ChatError> {
    from_proto(proto::Graph::decode(bytes)?)
}

/// Loads a `.graph` file, or CSV tables when `path` is a table stem.
///
/// Compiled graphs carry their own start node; `start` only applies to tables.
pub fn load_graph(path: &Path, start: &str) -> Result<Graph, ChatError> {
    if path.extension().map_or(false, |ext| ext == COMPILED_EXTENSION) {
        let graph = decode(&fs::read(path)?)?;
        info!("Loaded {} nodes from {}", graph.len(), path.display());
        Ok(graph)
    } else {
        load_csv(path, start)
    }
}
