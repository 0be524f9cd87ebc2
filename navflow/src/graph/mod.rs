//! Navigation graph model and construction
//!
//! Trees are loaded as [`TreeData`], merged by [`GraphBuilder`] into a
//! [`UnifiedGraph`] and stitched together with virtual
//! `ENTER_SUBTREE`/`EXIT_SUBTREE` edges.

pub mod analysis;
pub mod builder;
pub mod model;
pub mod tree;

pub use analysis::{GraphAnalyzer, TreeSummary};
pub use builder::{GraphBuilder, ENTER_SUBTREE_ACTION_SET, EXIT_SUBTREE_ACTION_SET};
pub use model::{
    Action, ActionSet, Edge, EdgeKind, GraphData, GraphError, Node, NodeId, NodeKind, TreeId,
    UnifiedGraph, Verification,
};
pub use tree::{ComebackAction, EdgeData, NodeData, TreeData};
