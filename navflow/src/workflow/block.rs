//! Block graph model for user-authored test cases
//!
//! The JSON shape is the one saved by the test-case editor:
//! `{"nodes": [{"id", "type", "data"}], "edges": [{"source", "target", "type"}]}`.

use crate::graph::{Action, Verification};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Marker where execution begins
    Start,
    /// Device actions
    Action,
    /// Device verifications
    Verification,
    /// Navigate to a node of a navigation tree
    Navigation,
    /// Run a nested graph several times
    Loop,
    /// Sleep for a fixed duration
    Wait,
    /// Terminal: the test case passed
    Success,
    /// Terminal: the test case failed
    Failure,
    /// Any type this engine does not know
    #[serde(other)]
    Unknown,
}

impl BlockKind {
    /// Whether reaching this block ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, BlockKind::Success | BlockKind::Failure)
    }

    /// Lowercase name as used in saved graphs
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Start => "start",
            BlockKind::Action => "action",
            BlockKind::Verification => "verification",
            BlockKind::Navigation => "navigation",
            BlockKind::Loop => "loop",
            BlockKind::Wait => "wait",
            BlockKind::Success => "success",
            BlockKind::Failure => "failure",
            BlockKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which outcome an edge is followed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockEdgeKind {
    /// Followed when the source block succeeds
    #[default]
    Success,
    /// Followed when the source block fails
    Failure,
    /// Anything else; rejected by validation
    #[serde(other)]
    Unknown,
}

impl fmt::Display for BlockEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockEdgeKind::Success => "success",
            BlockEdgeKind::Failure => "failure",
            BlockEdgeKind::Unknown => "unknown",
        })
    }
}

/// One block of a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unique id within its graph
    pub id: String,
    /// Block kind
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Kind-specific settings, see [`BlockSpec`]
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Block {
    /// Whether `data` has a non-null value for any of `keys`
    pub fn has_field(&self, keys: &[&str]) -> bool {
        keys.iter()
            .any(|k| self.data.get(*k).is_some_and(|v| !v.is_null()))
    }

    /// Interpret `data` according to the block kind
    ///
    /// The error names the offending field.
    pub fn spec(&self) -> Result<BlockSpec, String> {
        let data = Value::Object(self.data.clone());
        let spec = match self.kind {
            BlockKind::Start => BlockSpec::Start,
            BlockKind::Success => BlockSpec::Success,
            BlockKind::Failure => BlockSpec::Failure,
            BlockKind::Action => {
                let spec: ActionBlock = parse(data)?;
                if spec.command.trim().is_empty() {
                    return Err("action block requires a non-empty 'command'".to_string());
                }
                BlockSpec::Action(spec)
            }
            BlockKind::Verification => {
                let spec: VerificationBlock = parse(data)?;
                if spec.verification_type.trim().is_empty() {
                    return Err(
                        "verification block requires a non-empty 'verification_type'".to_string(),
                    );
                }
                BlockSpec::Verification(spec)
            }
            BlockKind::Navigation => BlockSpec::Navigation(parse(data)?),
            BlockKind::Loop => {
                let spec: LoopBlock = parse(data)?;
                if spec.iterations < 1 {
                    return Err("loop block requires 'iterations' >= 1".to_string());
                }
                BlockSpec::Loop(spec)
            }
            BlockKind::Wait => BlockSpec::Wait(parse(data)?),
            BlockKind::Unknown => return Err("unknown block type".to_string()),
        };
        Ok(spec)
    }
}

fn parse<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, String> {
    serde_json::from_value(data).map_err(|e| e.to_string())
}

/// A directed edge between two blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEdge {
    /// Source block id
    pub source: String,
    /// Target block id
    pub target: String,
    /// Outcome the edge is followed on
    #[serde(
        rename = "type",
        alias = "kind",
        alias = "sourceHandle",
        default
    )]
    pub kind: BlockEdgeKind,
}

impl BlockEdge {
    /// Create an edge
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: BlockEdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

/// A test case: blocks plus routing edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockGraph {
    /// Blocks, serialized as `nodes`
    #[serde(rename = "nodes", alias = "blocks", default)]
    pub blocks: Vec<Block>,
    /// Edges
    #[serde(default)]
    pub edges: Vec<BlockEdge>,
}

impl BlockGraph {
    /// Parse a graph from JSON text
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Block by id
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Blocks of a kind, in graph order
    pub fn blocks_of(&self, kind: BlockKind) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    /// The first edge leaving `source` for the given outcome
    pub fn next(&self, source: &str, kind: BlockEdgeKind) -> Option<&BlockEdge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.kind == kind)
    }

    /// Whether the graph has no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Settings of an `action` block
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionBlock {
    /// Device command
    pub command: String,
    /// Command parameters
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Actions retried by the executor if the primary one fails
    #[serde(default, alias = "retryActions")]
    pub retry_actions: Vec<Action>,
    /// Settle delay after the action in milliseconds
    #[serde(default, alias = "waitTime", alias = "wait_time")]
    pub wait_time_ms: u64,
}

impl ActionBlock {
    /// The device action this block runs
    pub fn action(&self) -> Action {
        Action {
            command: self.command.clone(),
            params: self.params.clone(),
            wait_time_ms: self.wait_time_ms,
        }
    }
}

/// Settings of a `verification` block
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerificationBlock {
    /// Verification type, e.g. `text_present`
    #[serde(alias = "verificationType")]
    pub verification_type: String,
    /// Controller command
    #[serde(default)]
    pub command: Option<String>,
    /// Verification parameters
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Image the verification runs against
    #[serde(default, alias = "imageSourceUrl")]
    pub image_source_url: Option<String>,
}

impl VerificationBlock {
    /// The verification this block runs
    pub fn verification(&self) -> Verification {
        Verification {
            verification_type: self.verification_type.clone(),
            command: self.command.clone(),
            params: self.params.clone(),
        }
    }
}

/// Settings of a `navigation` block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NavigationBlock {
    /// Target node label
    #[serde(default, alias = "targetNode", alias = "target_node_label")]
    pub target_node: Option<String>,
    /// Target node id
    #[serde(default, alias = "targetNodeId")]
    pub target_node_id: Option<String>,
    /// Root tree to navigate in, overriding the executor's
    #[serde(default, alias = "treeId")]
    pub tree_id: Option<String>,
}

impl NavigationBlock {
    /// The target reference, label preferred over id
    pub fn target(&self) -> Option<&str> {
        [&self.target_node, &self.target_node_id]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

/// What a loop does when an iteration fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopFailurePolicy {
    /// Stop and fail the loop
    #[default]
    Break,
    /// Run the next iteration anyway
    Continue,
}

/// Settings of a `loop` block
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoopBlock {
    /// Number of iterations, at least one
    pub iterations: u32,
    /// Failure policy
    #[serde(default, alias = "onFailure")]
    pub on_failure: LoopFailurePolicy,
    /// Graph run on each iteration
    #[serde(default, alias = "nested_graph", alias = "nestedGraph")]
    pub graph: BlockGraph,
}

/// Settings of a `wait` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct WaitBlock {
    /// Sleep duration in milliseconds
    #[serde(default, alias = "durationMs")]
    pub duration_ms: u64,
}

/// Typed view of a block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockSpec {
    /// Start marker
    Start,
    /// Action block
    Action(ActionBlock),
    /// Verification block
    Verification(VerificationBlock),
    /// Navigation block
    Navigation(NavigationBlock),
    /// Loop block
    Loop(LoopBlock),
    /// Wait block
    Wait(WaitBlock),
    /// Success terminal
    Success,
    /// Failure terminal
    Failure,
}
