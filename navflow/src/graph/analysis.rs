//! Structural analysis of a unified graph

use super::model::{EdgeKind, NodeId, TreeId, UnifiedGraph};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Per-tree summary returned by [`GraphAnalyzer::trees`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSummary {
    /// Tree id
    pub tree_id: TreeId,
    /// Tree name
    pub name: String,
    /// Depth in the hierarchy
    pub depth: u32,
    /// Nodes owned by the tree
    pub node_count: usize,
}

/// Analyzes reachability and composition of a [`UnifiedGraph`]
pub struct GraphAnalyzer<'a> {
    graph: &'a UnifiedGraph,
}

impl<'a> GraphAnalyzer<'a> {
    /// Creates a new analyzer for the given graph
    pub fn new(graph: &'a UnifiedGraph) -> Self {
        Self { graph }
    }

    /// All nodes reachable from `from`, including `from` itself
    pub fn reachable_from(&self, from: &str) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        if !self.graph.contains_node(from) {
            return reachable;
        }

        let mut to_visit = VecDeque::new();
        to_visit.push_back(NodeId::new(from));

        while let Some(node_id) = to_visit.pop_front() {
            if !reachable.insert(node_id.clone()) {
                continue;
            }
            for edge in self.graph.outgoing(node_id.as_str()) {
                if !reachable.contains(&edge.target) {
                    to_visit.push_back(edge.target.clone());
                }
            }
        }

        reachable
    }

    /// Nodes not reachable from `from`, in insertion order
    pub fn unreachable_from(&self, from: &str) -> Vec<NodeId> {
        let reachable = self.reachable_from(from);
        self.graph
            .nodes()
            .iter()
            .filter(|n| !reachable.contains(&n.id))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Edges taken from tree data, excluding virtual edges
    pub fn real_edge_count(&self) -> usize {
        self.graph.edges().iter().filter(|e| !e.is_virtual).count()
    }

    /// Edge counts per kind
    pub fn edges_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for kind in [EdgeKind::Normal, EdgeKind::EnterSubtree, EdgeKind::ExitSubtree] {
            counts.insert(kind.as_str(), 0);
        }
        for edge in self.graph.edges() {
            *counts.entry(edge.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Trees present in the graph, ordered by depth then first appearance
    pub fn trees(&self) -> Vec<TreeSummary> {
        let mut trees: Vec<TreeSummary> = Vec::new();
        for node in self.graph.nodes() {
            match trees.iter_mut().find(|t| t.tree_id == node.tree_id) {
                Some(summary) => summary.node_count += 1,
                None => trees.push(TreeSummary {
                    tree_id: node.tree_id.clone(),
                    name: node.tree_name.clone(),
                    depth: node.tree_depth,
                    node_count: 1,
                }),
            }
        }
        trees.sort_by_key(|t| t.depth);
        trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::test_helpers::*;

    #[test]
    fn test_reachability_over_virtual_edges() {
        let (root, child) = two_level_hierarchy();
        let graph = GraphBuilder::new().build(&[root, child]).unwrap();
        let analyzer = GraphAnalyzer::new(&graph);

        let reachable = analyzer.reachable_from("a");
        assert!(reachable.contains("s2"));
        assert_eq!(reachable.len(), graph.node_count());
        assert!(analyzer.unreachable_from("a").is_empty());

        let from_leaf = analyzer.unreachable_from("s2");
        assert_eq!(from_leaf.len(), graph.node_count() - 1);
    }

    #[test]
    fn test_reachable_from_unknown_node_is_empty() {
        let graph = GraphBuilder::new().build(&[linear_tree()]).unwrap();
        assert!(GraphAnalyzer::new(&graph).reachable_from("nope").is_empty());
    }

    #[test]
    fn test_edge_counts() {
        let (root, child) = two_level_hierarchy();
        let graph = GraphBuilder::new().build(&[root, child]).unwrap();
        let analyzer = GraphAnalyzer::new(&graph);

        assert_eq!(analyzer.real_edge_count(), 3);
        let kinds = analyzer.edges_by_kind();
        assert_eq!(kinds["NORMAL"], 3);
        assert_eq!(kinds["ENTER_SUBTREE"], 1);
        assert_eq!(kinds["EXIT_SUBTREE"], 1);
    }

    #[test]
    fn test_tree_summaries() {
        let (root, child) = two_level_hierarchy();
        let graph = GraphBuilder::new().build(&[child, root]).unwrap();
        let trees = GraphAnalyzer::new(&graph).trees();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].tree_id.as_str(), "main");
        assert_eq!(trees[0].node_count, 3);
        assert_eq!(trees[1].depth, 1);
    }
}
