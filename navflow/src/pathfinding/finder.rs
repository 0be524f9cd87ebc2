//! Shortest-path search over cached unified graphs

use super::resolver::resolve_node;
use super::transition::Transition;
use crate::cache::GraphCache;
use crate::error::{NavigationError, Result};
use crate::graph::{Edge, Node, NodeKind, UnifiedGraph};
use std::collections::{HashMap, HashSet, VecDeque};

/// A resolved navigation request
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// Resolved start node
    pub start: Node,
    /// Resolved target node
    pub target: Node,
    /// Steps from start to target; empty when they are the same node
    pub transitions: Vec<Transition>,
}

/// Finds shortest paths between nodes of cached unified graphs
///
/// The unified graph must already be cached for the (root tree, team) pair.
/// A cache miss is an error; there is no per-tree fallback.
#[derive(Debug, Clone)]
pub struct PathFinder {
    cache: GraphCache,
}

impl PathFinder {
    /// Create a path finder reading from `cache`
    pub fn new(cache: GraphCache) -> Self {
        Self { cache }
    }

    /// The cache this finder reads from
    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }

    /// Fetch the unified graph for a root tree, failing on a cache miss
    pub fn graph(&self, root_tree_id: &str, team_id: &str) -> Result<UnifiedGraph> {
        self.cache.get(root_tree_id, team_id).ok_or_else(|| {
            tracing::error!(tree_id = root_tree_id, team_id, "Unified graph not cached");
            NavigationError::cache(
                root_tree_id,
                team_id,
                "No unified graph cached; build and cache the tree hierarchy first",
            )
        })
    }

    /// Compute the transitions from `start_ref` (or the default start) to `target_ref`
    pub fn find_path(
        &self,
        root_tree_id: &str,
        target_ref: &str,
        team_id: &str,
        start_ref: Option<&str>,
    ) -> Result<Vec<Transition>> {
        Ok(self
            .resolve_path(root_tree_id, target_ref, team_id, start_ref)?
            .transitions)
    }

    /// Like [`find_path`](Self::find_path) but also returns the resolved endpoints
    pub fn resolve_path(
        &self,
        root_tree_id: &str,
        target_ref: &str,
        team_id: &str,
        start_ref: Option<&str>,
    ) -> Result<ResolvedPath> {
        let graph = self.graph(root_tree_id, team_id)?;
        find_path_in(&graph, root_tree_id, target_ref, start_ref)
    }
}

/// Compute a path over an already loaded graph
pub fn find_path_in(
    graph: &UnifiedGraph,
    root_tree_id: &str,
    target_ref: &str,
    start_ref: Option<&str>,
) -> Result<ResolvedPath> {
    let target = resolve_node(graph, target_ref)
        .ok_or_else(|| {
            NavigationError::pathfinding_at(root_tree_id, target_ref, "Target node not found")
        })?
        .node;
    if !target.is_navigable() {
        return Err(NavigationError::pathfinding_at(
            root_tree_id,
            target.id.as_str(),
            format!(
                "Target '{}' is an action node and cannot be navigated to",
                target.label
            ),
        ));
    }

    let start = match start_ref {
        Some(reference) => {
            resolve_node(graph, reference)
                .ok_or_else(|| {
                    NavigationError::pathfinding_at(root_tree_id, reference, "Start node not found")
                })?
                .node
        }
        None => default_start(graph)
            .ok_or_else(|| NavigationError::pathfinding(root_tree_id, "Unified graph is empty"))?,
    };

    if start.id == target.id {
        tracing::debug!(tree_id = root_tree_id, node_id = %target.id, "Already at target");
        return Ok(ResolvedPath {
            start: start.clone(),
            target: target.clone(),
            transitions: Vec::new(),
        });
    }

    let edges = shortest_path(graph, start.id.as_str(), target.id.as_str()).ok_or_else(|| {
        NavigationError::pathfinding_at(
            root_tree_id,
            target.id.as_str(),
            format!("No path from '{}' to '{}'", start.label, target.label),
        )
    })?;

    let mut transitions = Vec::with_capacity(edges.len());
    for (index, edge) in edges.iter().enumerate() {
        let (Some(from), Some(to)) = (
            graph.node(edge.source.as_str()),
            graph.node(edge.target.as_str()),
        ) else {
            return Err(NavigationError::pathfinding(
                root_tree_id,
                format!("Edge '{}' has a dangling endpoint", edge.id),
            ));
        };
        transitions.push(Transition::from_edge(index + 1, from, to, edge));
    }

    tracing::info!(
        tree_id = root_tree_id,
        from = %start.id,
        to = %target.id,
        steps = transitions.len(),
        "Found navigation path"
    );

    Ok(ResolvedPath {
        start: start.clone(),
        target: target.clone(),
        transitions,
    })
}

/// The node navigation starts from when no start is given
///
/// A node of the dedicated entry kind, else the first node flagged as an
/// entry point, else the first node.
pub fn default_start(graph: &UnifiedGraph) -> Option<&Node> {
    let nodes = graph.nodes();
    nodes
        .iter()
        .find(|n| n.kind == NodeKind::Entry)
        .or_else(|| nodes.iter().find(|n| n.is_entry_point))
        .or_else(|| nodes.first())
}

/// Breadth-first shortest path as a list of edges
///
/// Outgoing edges are explored in insertion order and the first discovery of
/// a node wins, so the result is stable for a given graph.
pub fn shortest_path<'g>(graph: &'g UnifiedGraph, from: &str, to: &str) -> Option<Vec<&'g Edge>> {
    if !graph.contains_node(from) || !graph.contains_node(to) {
        return None;
    }
    if from == to {
        return Some(Vec::new());
    }

    let mut came_from: HashMap<&'g str, &'g Edge> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(from);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for edge in graph.outgoing(current) {
            let next = edge.target.as_str();
            if !visited.insert(next) {
                continue;
            }
            came_from.insert(next, edge);
            if next == to {
                return Some(unwind(&came_from, from, to));
            }
            queue.push_back(next);
        }
    }
    None
}

fn unwind<'g>(came_from: &HashMap<&'g str, &'g Edge>, from: &str, to: &str) -> Vec<&'g Edge> {
    let mut path = Vec::new();
    let mut current = to;
    while current != from {
        match came_from.get(current) {
            Some(edge) => {
                path.push(*edge);
                current = edge.source.as_str();
            }
            None => break,
        }
    }
    path.reverse();
    path
}
