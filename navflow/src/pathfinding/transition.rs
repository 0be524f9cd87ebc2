//! One hop of a computed navigation path

use crate::graph::{Action, Edge, EdgeKind, Node, NodeId, TreeId, Verification};
use serde::{Deserialize, Serialize};

/// A single step of a navigation path with everything needed to execute it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// 1-indexed position in the path
    pub step_number: usize,
    /// Node the step starts from
    pub from_node_id: NodeId,
    /// Label of the start node
    pub from_node_label: String,
    /// Tree of the start node
    pub from_tree_id: TreeId,
    /// Node the step arrives at
    pub to_node_id: NodeId,
    /// Label of the arrival node
    pub to_node_label: String,
    /// Tree of the arrival node
    pub to_tree_id: TreeId,
    /// Edge traversed
    pub edge_id: String,
    /// Kind of the edge traversed
    pub edge_kind: EdgeKind,
    /// Whether the step moves between trees
    pub tree_context_changed: bool,
    /// Default action set of the edge
    pub action_set_id: String,
    /// Primary actions of the default action set
    pub actions: Vec<Action>,
    /// Retry actions of the default action set
    pub retry_actions: Vec<Action>,
    /// Failure actions of the default action set
    pub failure_actions: Vec<Action>,
    /// Verifications declared by the arrival node
    pub verifications: Vec<Verification>,
    /// Settle delay after the step in milliseconds
    pub final_wait_time_ms: u64,
    /// Whether the edge is a virtual cross-tree edge
    pub is_virtual: bool,
}

impl Transition {
    pub(crate) fn from_edge(step_number: usize, from: &Node, to: &Node, edge: &Edge) -> Self {
        let (action_set_id, actions, retry_actions, failure_actions) =
            match edge.default_action_set() {
                Some(set) => (
                    set.id.clone(),
                    set.actions.clone(),
                    set.retry_actions.clone(),
                    set.failure_actions.clone(),
                ),
                None => (String::new(), Vec::new(), Vec::new(), Vec::new()),
            };

        Self {
            step_number,
            from_node_id: from.id.clone(),
            from_node_label: from.label.clone(),
            from_tree_id: from.tree_id.clone(),
            to_node_id: to.id.clone(),
            to_node_label: to.label.clone(),
            to_tree_id: to.tree_id.clone(),
            edge_id: edge.id.clone(),
            edge_kind: edge.kind,
            tree_context_changed: from.tree_id != to.tree_id,
            action_set_id,
            actions,
            retry_actions,
            failure_actions,
            verifications: to.verifications.clone(),
            final_wait_time_ms: edge.final_wait_time_ms,
            is_virtual: edge.is_virtual,
        }
    }

    /// Device actions this step sends; virtual steps send none
    pub fn device_actions(&self) -> &[Action] {
        if self.is_virtual {
            &[]
        } else {
            &self.actions
        }
    }

    /// One-line description, e.g. `1. Home → Settings [NORMAL] press_key(DOWN)`
    pub fn describe(&self) -> String {
        let actions: Vec<String> = self.actions.iter().map(Action::describe).collect();
        let mut line = format!(
            "{}. {} → {} [{}]",
            self.step_number, self.from_node_label, self.to_node_label, self.edge_kind
        );
        if !actions.is_empty() {
            line.push(' ');
            line.push_str(&actions.join(", "));
        }
        line
    }
}
