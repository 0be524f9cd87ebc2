//! Tree data as delivered by a data loader
//!
//! Field names accept both `snake_case` and the `camelCase` spelling used by
//! stored tree definitions.

use super::model::{Action, ActionSet, NodeKind, Verification};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One navigation tree with its hierarchy metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
    /// Tree id
    #[serde(alias = "treeId", alias = "id")]
    pub tree_id: String,
    /// Tree name, usually the user interface name
    #[serde(default)]
    pub name: String,
    /// Parent tree, absent for a root tree
    #[serde(default, alias = "parentTreeId")]
    pub parent_tree_id: Option<String>,
    /// Node in the parent tree that opens this tree
    #[serde(default, alias = "parentNodeId")]
    pub parent_node_id: Option<String>,
    /// Depth in the hierarchy, root is 0
    #[serde(default, alias = "treeDepth")]
    pub tree_depth: u32,
    /// Nodes of the tree
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    /// Edges of the tree
    #[serde(default)]
    pub edges: Vec<EdgeData>,
}

impl TreeData {
    /// Create an empty root tree
    pub fn new(tree_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tree_id: tree_id.into(),
            name: name.into(),
            parent_tree_id: None,
            parent_node_id: None,
            tree_depth: 0,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Make this tree a child of `parent_node_id` in `parent_tree_id`
    pub fn with_parent(
        mut self,
        parent_tree_id: impl Into<String>,
        parent_node_id: impl Into<String>,
        depth: u32,
    ) -> Self {
        self.parent_tree_id = Some(parent_tree_id.into());
        self.parent_node_id = Some(parent_node_id.into());
        self.tree_depth = depth;
        self
    }

    /// The node a subtree is entered through
    ///
    /// The first node flagged as an entry point, else the first node.
    pub fn entry_node(&self) -> Option<&NodeData> {
        self.nodes
            .iter()
            .find(|n| n.is_entry_point || n.kind == NodeKind::Entry)
            .or_else(|| self.nodes.first())
    }
}

/// A node as stored in tree data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Node id
    #[serde(alias = "nodeId", alias = "node_id")]
    pub id: String,
    /// Human name
    #[serde(default)]
    pub label: String,
    /// Node kind
    #[serde(default, rename = "type", alias = "node_type", alias = "nodeType")]
    pub kind: NodeKind,
    /// Entry point flag
    #[serde(default, alias = "isEntryPoint")]
    pub is_entry_point: bool,
    /// Verifications run when this node is a navigation target
    #[serde(default)]
    pub verifications: Vec<Verification>,
    /// Opaque metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NodeData {
    /// Create a screen node
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Screen,
            is_entry_point: false,
            verifications: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Set the node kind
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Flag the node as an entry point
    pub fn entry_point(mut self) -> Self {
        self.is_entry_point = true;
        self
    }

    /// Add a verification
    pub fn with_verification(mut self, verification: Verification) -> Self {
        self.verifications.push(verification);
        self
    }
}

/// A comeback action given either as one action or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComebackAction {
    /// A single action
    One(Action),
    /// A list of actions
    Many(Vec<Action>),
}

impl ComebackAction {
    /// The actions as a list
    pub fn into_actions(self) -> Vec<Action> {
        match self {
            ComebackAction::One(action) => vec![action],
            ComebackAction::Many(actions) => actions,
        }
    }
}

/// An edge as stored in tree data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Edge id; derived from the endpoints when absent
    #[serde(default, alias = "edgeId", alias = "edge_id")]
    pub id: Option<String>,
    /// Source node id
    #[serde(alias = "sourceNodeId", alias = "source")]
    pub source_node_id: String,
    /// Target node id
    #[serde(alias = "targetNodeId", alias = "target")]
    pub target_node_id: String,
    /// Action sets; must be non-empty
    #[serde(default, alias = "actionSets")]
    pub action_sets: Vec<ActionSet>,
    /// Id of the default action set
    #[serde(default, alias = "defaultActionSetId")]
    pub default_action_set_id: Option<String>,
    /// Whether the reverse direction is traversable too
    #[serde(default, alias = "isBidirectional")]
    pub is_bidirectional: bool,
    /// Actions for the reverse direction
    #[serde(default, alias = "comebackAction", alias = "comeback_actions")]
    pub comeback_action: Option<ComebackAction>,
    /// Settle delay after the transition in milliseconds
    #[serde(default, alias = "finalWaitTime", alias = "final_wait_time_ms")]
    pub final_wait_time: u64,
}

impl EdgeData {
    /// Create an edge with a single default action set
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        actions: Vec<Action>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let set_id = format!("{source}_to_{target}");
        Self {
            id: None,
            source_node_id: source,
            target_node_id: target,
            action_sets: vec![ActionSet::new(set_id.clone(), actions)],
            default_action_set_id: Some(set_id),
            is_bidirectional: false,
            comeback_action: None,
            final_wait_time: 0,
        }
    }

    /// Set an explicit edge id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Make the edge bidirectional with an optional comeback action list
    pub fn bidirectional(mut self, comeback: Option<Vec<Action>>) -> Self {
        self.is_bidirectional = true;
        self.comeback_action = comeback.map(ComebackAction::Many);
        self
    }

    /// The edge id, derived from the endpoints when not given
    pub fn resolved_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}->{}", self.source_node_id, self.target_node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_data_accepts_camel_case() {
        let json = r#"{
            "treeId": "settings",
            "name": "Settings",
            "parentTreeId": "root",
            "parentNodeId": "menu",
            "treeDepth": 1,
            "nodes": [
                {"nodeId": "s1", "label": "Settings", "type": "entry", "isEntryPoint": true},
                {"id": "s2", "label": "Network", "verifications": [
                    {"verificationType": "text_present", "params": {"text": "Network"}}
                ]}
            ],
            "edges": [{
                "sourceNodeId": "s1",
                "targetNodeId": "s2",
                "actionSets": [{"id": "down", "actions": [{"command": "press_key", "params": {"key": "DOWN"}}],
                                "retryActions": [{"command": "press_key", "params": {"key": "OK"}}]}],
                "defaultActionSetId": "down",
                "isBidirectional": true,
                "comebackAction": {"command": "press_key", "params": {"key": "BACK"}},
                "finalWaitTime": 500
            }]
        }"#;

        let tree: TreeData = serde_json::from_str(json).unwrap();
        assert_eq!(tree.tree_id, "settings");
        assert_eq!(tree.parent_node_id.as_deref(), Some("menu"));
        assert_eq!(tree.tree_depth, 1);
        assert_eq!(tree.nodes[0].kind, NodeKind::Entry);
        assert_eq!(tree.nodes[1].verifications[0].verification_type, "text_present");

        let edge = &tree.edges[0];
        assert_eq!(edge.resolved_id(), "s1->s2");
        assert_eq!(edge.final_wait_time, 500);
        assert_eq!(edge.action_sets[0].retry_actions.len(), 1);
        let comeback = edge.comeback_action.clone().unwrap().into_actions();
        assert_eq!(comeback[0].command, "press_key");
    }

    #[test]
    fn test_entry_node_fallback() {
        let mut tree = TreeData::new("t", "T");
        assert!(tree.entry_node().is_none());

        tree.nodes.push(NodeData::new("first", "First"));
        tree.nodes.push(NodeData::new("second", "Second").entry_point());
        assert_eq!(tree.entry_node().map(|n| n.id.as_str()), Some("second"));

        tree.nodes[1].is_entry_point = false;
        assert_eq!(tree.entry_node().map(|n| n.id.as_str()), Some("first"));
    }
}
