//! Builds a unified graph from a tree hierarchy

use super::model::{
    Action, ActionSet, Edge, EdgeKind, GraphError, Node, NodeId, TreeId, UnifiedGraph,
};
use super::tree::{EdgeData, TreeData};
use crate::error::{NavigationError, Result};
use std::collections::HashMap;

/// Id of the synthetic action set on `ENTER_SUBTREE` edges
pub const ENTER_SUBTREE_ACTION_SET: &str = "enter_subtree";
/// Id of the synthetic action set on `EXIT_SUBTREE` edges
pub const EXIT_SUBTREE_ACTION_SET: &str = "exit_subtree";

const REVERSE_SUFFIX: &str = "_reverse";

/// Merges trees into one [`UnifiedGraph`] and stitches them with virtual edges
///
/// Edge insertion order is fixed: trees by ascending depth (stable for equal
/// depth), each tree's edges in input order, then reverse edges of
/// bidirectional edges, then virtual edges.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }

    /// Build the unified graph; any malformed edge fails the whole build
    pub fn build(&self, trees: &[TreeData]) -> Result<UnifiedGraph> {
        let mut ordered: Vec<&TreeData> = trees.iter().collect();
        ordered.sort_by_key(|t| t.tree_depth);

        let mut graph = UnifiedGraph::new();
        let mut bidirectional: Vec<(&TreeData, &EdgeData)> = Vec::new();

        for tree in ordered.iter().copied() {
            let tree_graph = self.build_tree(tree)?;
            for edge in tree.edges.iter().filter(|e| e.is_bidirectional) {
                if tree_graph.has_edge_between(&edge.source_node_id, &edge.target_node_id) {
                    bidirectional.push((tree, edge));
                }
            }
            merge_into(&mut graph, tree_graph, &tree.tree_id)?;
        }

        for (tree, edge) in bidirectional {
            self.add_reverse_edge(&mut graph, tree, edge)?;
        }

        self.add_virtual_edges(&mut graph, &ordered)?;

        tracing::info!(
            trees = ordered.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built unified graph"
        );
        Ok(graph)
    }

    fn build_tree(&self, tree: &TreeData) -> Result<UnifiedGraph> {
        let mut graph = UnifiedGraph::new();
        let tree_id = TreeId::new(tree.tree_id.clone());

        for node in &tree.nodes {
            graph
                .add_node(Node {
                    id: NodeId::new(node.id.clone()),
                    label: node.label.clone(),
                    kind: node.kind,
                    tree_id: tree_id.clone(),
                    tree_name: tree.name.clone(),
                    tree_depth: tree.tree_depth,
                    is_entry_point: node.is_entry_point,
                    verifications: node.verifications.clone(),
                    metadata: node.metadata.clone(),
                })
                .map_err(|e| graph_error(&tree.tree_id, e))?;
        }

        for data in &tree.edges {
            let edge_id = data.resolved_id();
            if !graph.contains_node(&data.source_node_id) || !graph.contains_node(&data.target_node_id)
            {
                tracing::warn!(
                    tree_id = %tree.tree_id,
                    edge_id = %edge_id,
                    "Skipping edge with an endpoint outside its tree"
                );
                continue;
            }

            let default_id = resolve_default_action_set(&tree.tree_id, &edge_id, data)?;
            graph
                .add_edge(Edge {
                    id: edge_id,
                    source: NodeId::new(data.source_node_id.clone()),
                    target: NodeId::new(data.target_node_id.clone()),
                    tree_id: tree_id.clone(),
                    kind: EdgeKind::Normal,
                    action_sets: data.action_sets.clone(),
                    default_action_set_id: default_id,
                    is_virtual: false,
                    final_wait_time_ms: data.final_wait_time,
                })
                .map_err(|e| graph_error(&tree.tree_id, e))?;
        }

        tracing::debug!(
            tree_id = %tree.tree_id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built tree graph"
        );
        Ok(graph)
    }

    fn add_reverse_edge(
        &self,
        graph: &mut UnifiedGraph,
        tree: &TreeData,
        data: &EdgeData,
    ) -> Result<()> {
        if graph.has_edge_between(&data.target_node_id, &data.source_node_id) {
            return Ok(());
        }

        let forward_id = data.resolved_id();
        let forward = graph
            .edge(&forward_id)
            .and_then(|e| e.default_action_set())
            .cloned()
            .ok_or_else(|| {
                NavigationError::tree(
                    &tree.tree_id,
                    format!("Edge '{forward_id}' vanished while adding its reverse"),
                )
            })?;

        let set_id = format!("{}{}", forward.id, REVERSE_SUFFIX);
        let set = match data.comeback_action.clone() {
            Some(comeback) => ActionSet::new(set_id, comeback.into_actions()),
            None => ActionSet {
                id: set_id,
                ..forward
            },
        };

        graph
            .add_edge(Edge {
                id: format!("{forward_id}{REVERSE_SUFFIX}"),
                source: NodeId::new(data.target_node_id.clone()),
                target: NodeId::new(data.source_node_id.clone()),
                tree_id: TreeId::new(tree.tree_id.clone()),
                kind: EdgeKind::Normal,
                default_action_set_id: set.id.clone(),
                action_sets: vec![set],
                is_virtual: false,
                final_wait_time_ms: data.final_wait_time,
            })
            .map_err(|e| graph_error(&tree.tree_id, e))
    }

    fn add_virtual_edges(&self, graph: &mut UnifiedGraph, trees: &[&TreeData]) -> Result<()> {
        let mut children_of: HashMap<&str, &str> = HashMap::new();

        for child in trees {
            let Some(parent_node_id) = child.parent_node_id.as_deref() else {
                continue;
            };

            if let Some(existing) = children_of.insert(parent_node_id, child.tree_id.as_str()) {
                return Err(NavigationError::tree(
                    &child.tree_id,
                    format!(
                        "Parent node '{parent_node_id}' already opens tree '{existing}'"
                    ),
                ));
            }

            let parent = graph.node(parent_node_id).ok_or_else(|| {
                NavigationError::tree(
                    &child.tree_id,
                    format!("Parent node '{parent_node_id}' is not part of the hierarchy"),
                )
            })?;
            if let Some(parent_tree) = child.parent_tree_id.as_deref() {
                if parent.tree_id.as_str() != parent_tree {
                    return Err(NavigationError::CrossTreeNavigation {
                        from_tree_id: parent.tree_id.to_string(),
                        to_tree_id: child.tree_id.clone(),
                        reason: format!(
                            "Parent node '{parent_node_id}' belongs to tree '{}', not '{parent_tree}'",
                            parent.tree_id
                        ),
                    });
                }
            }

            let Some(entry) = child.entry_node() else {
                tracing::warn!(tree_id = %child.tree_id, "Child tree has no nodes; not linked");
                continue;
            };

            let parent_id = NodeId::new(parent_node_id);
            let entry_id = NodeId::new(entry.id.clone());
            let tree_id = TreeId::new(child.tree_id.clone());

            graph
                .add_edge(virtual_edge(
                    format!("virtual_enter_{}_{}", parent_id, tree_id),
                    parent_id.clone(),
                    entry_id.clone(),
                    tree_id.clone(),
                    EdgeKind::EnterSubtree,
                ))
                .map_err(|e| graph_error(&child.tree_id, e))?;
            graph
                .add_edge(virtual_edge(
                    format!("virtual_exit_{}_{}", tree_id, parent_id),
                    entry_id,
                    parent_id,
                    tree_id,
                    EdgeKind::ExitSubtree,
                ))
                .map_err(|e| graph_error(&child.tree_id, e))?;

            tracing::debug!(
                parent_node = parent_node_id,
                child_tree = %child.tree_id,
                entry = %entry.id,
                "Linked child tree"
            );
        }
        Ok(())
    }
}

fn resolve_default_action_set(tree_id: &str, edge_id: &str, data: &EdgeData) -> Result<String> {
    if data.action_sets.is_empty() {
        return Err(NavigationError::tree(
            tree_id,
            format!("Edge '{edge_id}' has no action sets"),
        ));
    }
    let default_id = data.default_action_set_id.as_deref().ok_or_else(|| {
        NavigationError::tree(
            tree_id,
            format!("Edge '{edge_id}' has no default action set id"),
        )
    })?;
    if !data.action_sets.iter().any(|s| s.id == default_id) {
        return Err(NavigationError::tree(
            tree_id,
            format!("Edge '{edge_id}' default action set '{default_id}' is not one of its action sets"),
        ));
    }
    Ok(default_id.to_string())
}

fn virtual_edge(
    id: String,
    source: NodeId,
    target: NodeId,
    tree_id: TreeId,
    kind: EdgeKind,
) -> Edge {
    let set_id = match kind {
        EdgeKind::ExitSubtree => EXIT_SUBTREE_ACTION_SET,
        _ => ENTER_SUBTREE_ACTION_SET,
    };
    let action = Action::new(set_id).with_param("tree_id", tree_id.as_str());
    Edge {
        id,
        source,
        target,
        tree_id,
        kind,
        action_sets: vec![ActionSet::new(set_id, vec![action])],
        default_action_set_id: set_id.to_string(),
        is_virtual: true,
        final_wait_time_ms: 0,
    }
}

fn merge_into(graph: &mut UnifiedGraph, tree_graph: UnifiedGraph, tree_id: &str) -> Result<()> {
    for node in tree_graph.nodes() {
        graph
            .add_node(node.clone())
            .map_err(|e| graph_error(tree_id, e))?;
    }
    for edge in tree_graph.edges() {
        graph
            .add_edge(edge.clone())
            .map_err(|e| graph_error(tree_id, e))?;
    }
    Ok(())
}

fn graph_error(tree_id: &str, error: GraphError) -> NavigationError {
    NavigationError::tree(tree_id, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::NodeKind;
    use crate::graph::tree::NodeData;
    use crate::test_helpers::*;

    #[test]
    fn test_build_single_tree() {
        let graph = GraphBuilder::new().build(&[linear_tree()]).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let node = graph.node("b").unwrap();
        assert_eq!(node.tree_id.as_str(), "main");
        assert_eq!(node.tree_name, "Main");
        assert!(graph.edges().iter().all(|e| !e.is_virtual));
    }

    #[test]
    fn test_edge_with_missing_endpoint_is_skipped() {
        let mut tree = linear_tree();
        tree.edges
            .push(EdgeData::new("a", "ghost", vec![press_key("UP")]));
        let graph = GraphBuilder::new().build(&[tree]).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_empty_action_sets_is_build_error() {
        let mut tree = linear_tree();
        tree.edges[0].action_sets.clear();
        let err = GraphBuilder::new().build(&[tree]).unwrap_err();
        assert!(matches!(err, NavigationError::NavigationTree { .. }));
        assert!(err.to_string().contains("no action sets"));
    }

    #[test]
    fn test_unknown_default_action_set_is_build_error() {
        let mut tree = linear_tree();
        tree.edges[1].default_action_set_id = Some("missing".to_string());
        let err = GraphBuilder::new().build(&[tree]).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_duplicate_node_across_trees_is_build_error() {
        let root = linear_tree();
        let mut child = TreeData::new("child", "Child").with_parent("main", "c", 1);
        child.nodes.push(NodeData::new("a", "Duplicate"));
        let err = GraphBuilder::new().build(&[root, child]).unwrap_err();
        assert!(err.to_string().contains("Duplicate node id 'a'"));
    }

    #[test]
    fn test_virtual_edges_link_child_entry() {
        let (root, child) = two_level_hierarchy();
        let graph = GraphBuilder::new().build(&[child, root]).unwrap();

        let enter = graph.edge_between("c", "s1").unwrap();
        assert_eq!(enter.kind, EdgeKind::EnterSubtree);
        assert!(enter.is_virtual);
        assert_eq!(enter.action_sets.len(), 1);
        assert_eq!(enter.default_action_set_id, ENTER_SUBTREE_ACTION_SET);

        let exit = graph.edge_between("s1", "c").unwrap();
        assert_eq!(exit.kind, EdgeKind::ExitSubtree);
        assert_eq!(exit.action_sets.len(), 1);
        assert_eq!(exit.default_action_set_id, EXIT_SUBTREE_ACTION_SET);
    }

    #[test]
    fn test_virtual_edges_follow_real_edges() {
        let (root, child) = two_level_hierarchy();
        let graph = GraphBuilder::new().build(&[root, child]).unwrap();
        let first_virtual = graph.edges().iter().position(|e| e.is_virtual).unwrap();
        assert!(graph.edges()[first_virtual..].iter().all(|e| e.is_virtual));
    }

    #[test]
    fn test_child_without_flagged_entry_uses_first_node() {
        let (root, mut child) = two_level_hierarchy();
        for node in &mut child.nodes {
            node.is_entry_point = false;
            node.kind = NodeKind::Screen;
        }
        child.nodes.swap(0, 1);
        let graph = GraphBuilder::new().build(&[root, child]).unwrap();
        assert!(graph.edge_between("c", "s2").is_some());
    }

    #[test]
    fn test_parent_node_with_two_children_is_error() {
        let (root, child) = two_level_hierarchy();
        let mut second = TreeData::new("other", "Other").with_parent("main", "c", 1);
        second.nodes.push(NodeData::new("o1", "Other"));
        let err = GraphBuilder::new().build(&[root, child, second]).unwrap_err();
        assert!(err.to_string().contains("already opens"));
    }

    #[test]
    fn test_parent_tree_mismatch_is_cross_tree_error() {
        let (root, mut child) = two_level_hierarchy();
        child.parent_tree_id = Some("elsewhere".to_string());
        let err = GraphBuilder::new().build(&[root, child]).unwrap_err();
        assert!(matches!(err, NavigationError::CrossTreeNavigation { .. }));
    }

    #[test]
    fn test_bidirectional_edge_uses_comeback_action() {
        let mut tree = linear_tree();
        tree.edges[0] = EdgeData::new("a", "b", vec![press_key("DOWN")])
            .bidirectional(Some(vec![press_key("UP")]));
        let graph = GraphBuilder::new().build(&[tree]).unwrap();

        let reverse = graph.edge_between("b", "a").unwrap();
        assert_eq!(reverse.id, "a->b_reverse");
        let set = reverse.default_action_set().unwrap();
        assert_eq!(set.actions, vec![press_key("UP")]);
    }

    #[test]
    fn test_bidirectional_edge_falls_back_to_forward_action() {
        let mut tree = linear_tree();
        tree.edges[0] = EdgeData::new("a", "b", vec![press_key("DOWN")]).bidirectional(None);
        let graph = GraphBuilder::new().build(&[tree]).unwrap();

        let reverse = graph.edge_between("b", "a").unwrap();
        assert_eq!(reverse.default_action_set().unwrap().actions, vec![press_key("DOWN")]);
    }

    #[test]
    fn test_explicit_reverse_edge_is_not_duplicated() {
        let mut tree = linear_tree();
        tree.edges[0] = EdgeData::new("a", "b", vec![press_key("DOWN")]).bidirectional(None);
        tree.edges
            .push(EdgeData::new("b", "a", vec![press_key("BACK")]));
        let graph = GraphBuilder::new().build(&[tree]).unwrap();

        let reverse: Vec<_> = graph.outgoing("b").filter(|e| e.target.as_str() == "a").collect();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].default_action_set().unwrap().actions, vec![press_key("BACK")]);
    }
}
