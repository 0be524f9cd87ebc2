//! Structural validation of block graphs

use super::block::{BlockEdgeKind, BlockGraph, BlockKind, BlockSpec};
use serde::Serialize;
use std::collections::HashSet;

/// Errors and warnings found in a block graph
///
/// Errors block execution; warnings never do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Hard errors
    pub errors: Vec<String>,
    /// Warnings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether the graph may be executed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether there is anything to report
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn absorb(&mut self, prefix: &str, nested: ValidationReport) {
        self.errors
            .extend(nested.errors.into_iter().map(|e| format!("{prefix}: {e}")));
        self.warnings
            .extend(nested.warnings.into_iter().map(|w| format!("{prefix}: {w}")));
    }
}

const NAVIGATION_TARGET_KEYS: &[&str] = &[
    "target_node",
    "targetNode",
    "target_node_label",
    "target_node_id",
    "targetNodeId",
];

/// Validate `graph` and every nested loop graph
pub fn validate(graph: &BlockGraph) -> ValidationReport {
    let mut report = ValidationReport::default();

    let starts = graph.blocks_of(BlockKind::Start).count();
    if starts != 1 {
        report.error(format!("Expected exactly one start block, found {starts}"));
    }
    if !graph.blocks.iter().any(|b| b.kind.is_terminal()) {
        report.error("No success or failure block");
    }

    let mut ids = HashSet::new();
    for block in &graph.blocks {
        if !ids.insert(block.id.as_str()) {
            report.error(format!("Duplicate block id '{}'", block.id));
        }
    }

    for edge in &graph.edges {
        if edge.kind == BlockEdgeKind::Unknown {
            report.error(format!(
                "Edge '{}' -> '{}' has a kind other than success or failure",
                edge.source, edge.target
            ));
        }
        for end in [&edge.source, &edge.target] {
            if !ids.contains(end.as_str()) {
                report.error(format!(
                    "Edge '{}' -> '{}' references unknown block '{}'",
                    edge.source, edge.target, end
                ));
            }
        }
    }

    for block in &graph.blocks {
        if block.kind == BlockKind::Navigation && !block.has_field(NAVIGATION_TARGET_KEYS) {
            report.error(format!(
                "Block '{}': navigation block requires 'target_node' or 'target_node_id'",
                block.id
            ));
        }

        match block.spec() {
            Err(reason) => report.error(format!("Block '{}': {}", block.id, reason)),
            Ok(BlockSpec::Loop(spec)) => {
                if spec.graph.is_empty() {
                    report.warning(format!("Loop block '{}' has an empty nested graph", block.id));
                } else {
                    report.absorb(&block.id, validate(&spec.graph));
                }
            }
            Ok(_) => {}
        }

        let outgoing = graph.edges.iter().filter(|e| e.source == block.id).count();
        let incoming = graph.edges.iter().filter(|e| e.target == block.id).count();

        if block.kind.is_terminal() {
            if outgoing > 0 {
                report.warning(format!(
                    "Terminal block '{}' has outgoing edges that are never followed",
                    block.id
                ));
            }
            continue;
        }

        if block.kind != BlockKind::Start && incoming == 0 {
            report.warning(format!("Block '{}' is not reachable from any edge", block.id));
        }
        if graph.next(&block.id, BlockEdgeKind::Success).is_none() {
            report.warning(format!("Block '{}' has no success edge", block.id));
        }
    }

    for warning in &report.warnings {
        tracing::debug!("Validation warning: {}", warning);
    }
    report
}
