//! Resolves a node reference (id or label) to a node

use crate::graph::{Node, UnifiedGraph};

/// One way of matching a reference against a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// The reference equals the node id
    ExactId,
    /// The reference equals the node label
    ExactLabel,
    /// The reference equals the node label ignoring case
    CaseInsensitiveLabel,
}

impl ResolutionStrategy {
    /// Strategies in the order they are tried
    pub const ORDER: [ResolutionStrategy; 3] = [
        ResolutionStrategy::ExactId,
        ResolutionStrategy::ExactLabel,
        ResolutionStrategy::CaseInsensitiveLabel,
    ];

    /// Whether `node` matches `reference` under this strategy
    pub fn matches(&self, node: &Node, reference: &str) -> bool {
        match self {
            ResolutionStrategy::ExactId => node.id.as_str() == reference,
            ResolutionStrategy::ExactLabel => node.label == reference,
            ResolutionStrategy::CaseInsensitiveLabel => {
                node.label.to_lowercase() == reference.to_lowercase()
            }
        }
    }
}

/// A resolved reference and the strategy that matched it
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'g> {
    /// The matched node
    pub node: &'g Node,
    /// The strategy that matched
    pub strategy: ResolutionStrategy,
}

/// Resolve `reference` with the default strategy order
pub fn resolve_node<'g>(graph: &'g UnifiedGraph, reference: &str) -> Option<Resolution<'g>> {
    resolve_with(graph, reference, &ResolutionStrategy::ORDER)
}

/// Resolve `reference` trying `strategies` in order
///
/// The first strategy with any match wins. Within a strategy the first node
/// in graph order wins, so shallower trees take precedence over deeper ones.
pub fn resolve_with<'g>(
    graph: &'g UnifiedGraph,
    reference: &str,
    strategies: &[ResolutionStrategy],
) -> Option<Resolution<'g>> {
    if reference.is_empty() {
        return None;
    }

    for &strategy in strategies {
        if strategy == ResolutionStrategy::ExactId {
            if let Some(node) = graph.node(reference) {
                return Some(Resolution { node, strategy });
            }
            continue;
        }

        let mut matches = graph.nodes().iter().filter(|n| strategy.matches(n, reference));
        if let Some(node) = matches.next() {
            let others = matches.count();
            if others > 0 {
                tracing::debug!(
                    reference,
                    node_id = %node.id,
                    others,
                    "Label matches several nodes; using the first"
                );
            }
            return Some(Resolution { node, strategy });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_node;

    fn graph() -> UnifiedGraph {
        let mut graph = UnifiedGraph::new();
        graph.add_node(create_node("home", "Home", "root")).unwrap();
        graph.add_node(create_node("settings", "Settings", "root")).unwrap();
        graph.add_node(create_node("Home", "Landing", "root")).unwrap();
        graph.add_node(create_node("child_settings", "Settings", "child")).unwrap();
        graph
    }

    #[test]
    fn test_id_wins_over_label() {
        let graph = graph();
        let r = resolve_node(&graph, "Home").unwrap();
        assert_eq!(r.node.id.as_str(), "Home");
        assert_eq!(r.strategy, ResolutionStrategy::ExactId);
    }

    #[test]
    fn test_exact_label() {
        let graph = graph();
        let r = resolve_node(&graph, "Landing").unwrap();
        assert_eq!(r.node.id.as_str(), "Home");
        assert_eq!(r.strategy, ResolutionStrategy::ExactLabel);
    }

    #[test]
    fn test_case_insensitive_label() {
        let graph = graph();
        let r = resolve_node(&graph, "LANDING").unwrap();
        assert_eq!(r.node.id.as_str(), "Home");
        assert_eq!(r.strategy, ResolutionStrategy::CaseInsensitiveLabel);
    }

    #[test]
    fn test_duplicate_label_resolves_to_first() {
        let graph = graph();
        let r = resolve_node(&graph, "Settings").unwrap();
        assert_eq!(r.node.id.as_str(), "settings");
    }

    #[test]
    fn test_unresolved() {
        let graph = graph();
        assert!(resolve_node(&graph, "Nowhere").is_none());
        assert!(resolve_node(&graph, "").is_none());
    }

    #[test]
    fn test_custom_strategy_list() {
        let graph = graph();
        assert!(resolve_with(&graph, "landing", &[ResolutionStrategy::ExactLabel]).is_none());
        assert!(resolve_with(&graph, "home", &[ResolutionStrategy::ExactId]).is_some());
    }
}
