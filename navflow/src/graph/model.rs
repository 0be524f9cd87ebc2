//! Nodes, edges, action sets and the merged multi-tree graph

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::HashMap;
use thiserror::Error;

/// Identifier of a node, unique across a unified graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new node ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a navigation tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    /// Create a new tree ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TreeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for TreeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TreeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TreeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of app state a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Ordinary screen
    #[default]
    Screen,
    /// Dedicated entry point of a tree
    Entry,
    /// An action node; never a navigation target
    Action,
    /// Exit point of a tree
    Exit,
    /// Menu screen
    Menu,
    /// Any type this crate does not distinguish
    #[serde(other)]
    Other,
}

impl NodeKind {
    /// Get the string representation of the node kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Screen => "screen",
            NodeKind::Entry => "entry",
            NodeKind::Action => "action",
            NodeKind::Exit => "exit",
            NodeKind::Menu => "menu",
            NodeKind::Other => "other",
        }
    }
}

/// Kind of edge in a unified graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Edge taken from tree data
    #[default]
    Normal,
    /// Virtual edge from a parent node into its child tree
    EnterSubtree,
    /// Virtual edge from a child tree back to its parent node
    ExitSubtree,
}

impl EdgeKind {
    /// Get the string representation of the edge kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Normal => "NORMAL",
            EdgeKind::EnterSubtree => "ENTER_SUBTREE",
            EdgeKind::ExitSubtree => "EXIT_SUBTREE",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single device action, e.g. `press_key(DOWN)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Command understood by the device controller
    pub command: String,
    /// Command parameters
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Settle delay after the action in milliseconds
    #[serde(default, alias = "waitTime", alias = "wait_time")]
    pub wait_time_ms: u64,
}

impl Action {
    /// Create an action with no parameters
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Map::new(),
            wait_time_ms: 0,
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Short human-readable form, e.g. `press_key(DOWN)`
    pub fn describe(&self) -> String {
        let args: Vec<String> = self
            .params
            .values()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("{}({})", self.command, args.join(", "))
    }
}

/// A single verification, e.g. `text_present("Home")`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Verification type understood by the verification controller
    #[serde(alias = "verificationType", alias = "type")]
    pub verification_type: String,
    /// Controller-specific command, if any
    #[serde(default)]
    pub command: Option<String>,
    /// Verification parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Verification {
    /// Create a verification with no parameters
    pub fn new(verification_type: impl Into<String>) -> Self {
        Self {
            verification_type: verification_type.into(),
            command: None,
            params: Map::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Named bundle of primary, retry and failure actions on an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSet {
    /// Identifier, unique within its edge
    pub id: String,
    /// Optional display label
    #[serde(default)]
    pub label: Option<String>,
    /// Primary actions
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Actions executed when a primary action fails
    #[serde(default, alias = "retryActions")]
    pub retry_actions: Vec<Action>,
    /// Actions executed when retries are exhausted
    #[serde(default, alias = "failureActions")]
    pub failure_actions: Vec<Action>,
}

impl ActionSet {
    /// Create an action set with the given primary actions
    pub fn new(id: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            id: id.into(),
            label: None,
            actions,
            retry_actions: Vec::new(),
            failure_actions: Vec::new(),
        }
    }
}

/// An app state within a unified graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique node id
    pub id: NodeId,
    /// Human name, not unique across trees
    pub label: String,
    /// Node kind
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Owning tree
    pub tree_id: TreeId,
    /// Owning tree's name
    pub tree_name: String,
    /// Depth of the owning tree in its hierarchy (root is 0)
    pub tree_depth: u32,
    /// Flagged as an entry point by the tree author
    pub is_entry_point: bool,
    /// Verifications that prove the device is at this node
    pub verifications: Vec<Verification>,
    /// Opaque metadata
    pub metadata: Map<String, Value>,
}

impl Node {
    /// Whether this node can be the target of a navigation
    pub fn is_navigable(&self) -> bool {
        self.kind != NodeKind::Action
    }

    /// Whether this node counts as an entry point of its tree
    pub fn is_entry(&self) -> bool {
        self.is_entry_point || self.kind == NodeKind::Entry
    }
}

/// A directed transition within a unified graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Globally unique edge id
    pub id: String,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Tree the edge was defined in (the child tree for virtual edges)
    pub tree_id: TreeId,
    /// Edge kind
    pub kind: EdgeKind,
    /// Non-empty list of action sets
    pub action_sets: Vec<ActionSet>,
    /// Id of the action set used for navigation
    pub default_action_set_id: String,
    /// Synthetic cross-tree edge not present in source data
    pub is_virtual: bool,
    /// Settle delay after the whole transition in milliseconds
    pub final_wait_time_ms: u64,
}

impl Edge {
    /// The action set used when navigating along this edge
    pub fn default_action_set(&self) -> Option<&ActionSet> {
        self.action_sets
            .iter()
            .find(|set| set.id == self.default_action_set_id)
    }
}

/// Structural errors raised while assembling a [`UnifiedGraph`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node id is already present
    #[error("Duplicate node id '{0}'")]
    DuplicateNode(NodeId),

    /// An edge id is already present
    #[error("Duplicate edge id '{0}'")]
    DuplicateEdge(String),

    /// An edge references a node that is not in the graph
    #[error("Edge '{edge_id}' references unknown node '{node_id}'")]
    UnknownNode {
        /// Offending edge
        edge_id: String,
        /// Missing endpoint
        node_id: NodeId,
    },
}

/// Serialized form of a [`UnifiedGraph`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    /// All nodes in insertion order
    pub nodes: Vec<Node>,
    /// All edges in insertion order
    pub edges: Vec<Edge>,
}

/// The merged directed graph of a tree hierarchy plus virtual edges
///
/// Node and edge ids are global. Outgoing edges are kept in insertion order,
/// which makes every traversal over the graph deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphData", into = "GraphData")]
pub struct UnifiedGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<NodeId, usize>,
    edge_ids: HashMap<String, usize>,
    outgoing: Vec<Vec<usize>>,
}

impl PartialEq for UnifiedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl UnifiedGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; ids must be unique
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node_index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        Ok(())
    }

    /// Add an edge; both endpoints must already exist and the id must be unique
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edge_ids.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdge(edge.id));
        }
        let source = self.require_node(&edge.id, &edge.source)?;
        self.require_node(&edge.id, &edge.target)?;

        let index = self.edges.len();
        self.edge_ids.insert(edge.id.clone(), index);
        self.outgoing[source].push(index);
        self.edges.push(edge);
        Ok(())
    }

    fn require_node(&self, edge_id: &str, node_id: &NodeId) -> Result<usize, GraphError> {
        self.node_index
            .get(node_id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode {
                edge_id: edge_id.to_string(),
                node_id: node_id.clone(),
            })
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    /// Look up an edge by id
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_ids.get(id).map(|&i| &self.edges[i])
    }

    /// Whether a node id is present
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, virtual ones included
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Outgoing edges of a node in insertion order
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> + '_ {
        let indices: &[usize] = match self.node_index.get(id) {
            Some(&i) => &self.outgoing[i],
            None => &[],
        };
        indices.iter().map(move |&e| &self.edges[e])
    }

    /// The first edge inserted from `from` to `to`
    pub fn edge_between(&self, from: &str, to: &str) -> Option<&Edge> {
        self.outgoing(from).find(|e| e.target.as_str() == to)
    }

    /// Whether any edge goes from `from` to `to`
    pub fn has_edge_between(&self, from: &str, to: &str) -> bool {
        self.edge_between(from, to).is_some()
    }
}

impl TryFrom<GraphData> for UnifiedGraph {
    type Error = GraphError;

    fn try_from(data: GraphData) -> Result<Self, Self::Error> {
        let mut graph = UnifiedGraph::new();
        for node in data.nodes {
            graph.add_node(node)?;
        }
        for edge in data.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

impl From<UnifiedGraph> for GraphData {
    fn from(graph: UnifiedGraph) -> Self {
        GraphData {
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}
