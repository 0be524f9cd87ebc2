//! Fixtures shared by unit tests

use crate::graph::{
    Action, ActionSet, Edge, EdgeData, EdgeKind, Node, NodeData, NodeId, NodeKind, TreeData,
    TreeId, Verification,
};
use crate::workflow::{Block, BlockEdge, BlockEdgeKind, BlockGraph, BlockKind};
use serde_json::{json, Map, Value};

/// A screen node in `tree`
pub fn create_node(id: &str, label: &str, tree: &str) -> Node {
    Node {
        id: NodeId::new(id),
        label: label.to_string(),
        kind: NodeKind::Screen,
        tree_id: TreeId::new(tree),
        tree_name: tree.to_string(),
        tree_depth: 0,
        is_entry_point: false,
        verifications: Vec::new(),
        metadata: Map::new(),
    }
}

/// A normal edge with a single `default` action set running `command`
pub fn create_edge(id: &str, source: &str, target: &str, tree: &str, command: &str) -> Edge {
    Edge {
        id: id.to_string(),
        source: NodeId::new(source),
        target: NodeId::new(target),
        tree_id: TreeId::new(tree),
        kind: EdgeKind::Normal,
        action_sets: vec![ActionSet::new("default", vec![Action::new(command)])],
        default_action_set_id: "default".to_string(),
        is_virtual: false,
        final_wait_time_ms: 0,
    }
}

pub fn press_key(key: &str) -> Action {
    Action::new("press_key").with_param("key", key)
}

pub fn text_present(text: &str) -> Verification {
    Verification::new("text_present").with_param("text", text)
}

/// `a` (entry) → `b` → `c`, where `c` verifies the text "Home"
pub fn linear_tree() -> TreeData {
    let mut tree = TreeData::new("main", "Main");
    tree.nodes = vec![
        NodeData::new("a", "Node A").entry_point(),
        NodeData::new("b", "Node B"),
        NodeData::new("c", "Node C").with_verification(text_present("Home")),
    ];
    tree.edges = vec![
        EdgeData::new("a", "b", vec![press_key("DOWN")]),
        EdgeData::new("b", "c", vec![press_key("DOWN")]),
    ];
    tree
}

/// [`linear_tree`] plus a child tree opened from `c`: `s1` (entry) → `s2`
pub fn two_level_hierarchy() -> (TreeData, TreeData) {
    let mut child = TreeData::new("child", "Child").with_parent("main", "c", 1);
    child.nodes = vec![
        NodeData::new("s1", "Sub One").entry_point(),
        NodeData::new("s2", "Sub Two"),
    ];
    child.edges = vec![EdgeData::new("s1", "s2", vec![press_key("OK")])];
    (linear_tree(), child)
}

pub fn block(id: &str, kind: BlockKind, data: Value) -> Block {
    let data = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Block {
        id: id.to_string(),
        kind,
        data,
    }
}

pub fn action_block(id: &str, command: &str) -> Block {
    block(id, BlockKind::Action, json!({ "command": command }))
}

pub fn success_edge(source: &str, target: &str) -> BlockEdge {
    BlockEdge::new(source, target, BlockEdgeKind::Success)
}

pub fn failure_edge(source: &str, target: &str) -> BlockEdge {
    BlockEdge::new(source, target, BlockEdgeKind::Failure)
}

/// start → each command in order → success, with an explicit failure terminal
pub fn action_chain(commands: &[&str]) -> BlockGraph {
    let mut blocks = vec![block("start", BlockKind::Start, Value::Null)];
    let mut edges = Vec::new();
    let mut previous = "start".to_string();
    for (i, command) in commands.iter().enumerate() {
        let id = format!("step{}", i + 1);
        blocks.push(action_block(&id, command));
        edges.push(success_edge(&previous, &id));
        previous = id;
    }
    blocks.push(block("ok", BlockKind::Success, Value::Null));
    blocks.push(block("fail", BlockKind::Failure, Value::Null));
    edges.push(success_edge(&previous, "ok"));
    BlockGraph { blocks, edges }
}

/// A loop block running `nested` `iterations` times
pub fn loop_block(id: &str, iterations: u32, on_failure: &str, nested: &BlockGraph) -> Block {
    block(
        id,
        BlockKind::Loop,
        json!({
            "iterations": iterations,
            "on_failure": on_failure,
            "graph": nested,
        }),
    )
}
