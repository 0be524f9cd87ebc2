//! Test-case workflows
//!
//! A test case is a [`BlockGraph`] of action, verification, navigation, loop
//! and wait blocks routed by success and failure edges. It is checked with
//! [`validate`] and run by a [`WorkflowExecutor`], either directly or in the
//! background through an [`ExecutionRegistry`].

mod block;
mod executor;
mod registry;
mod state;
mod validator;

pub use block::{
    ActionBlock, Block, BlockEdge, BlockEdgeKind, BlockGraph, BlockKind, BlockSpec, LoopBlock,
    LoopFailurePolicy, NavigationBlock, VerificationBlock, WaitBlock,
};
pub use executor::{
    BlockResult, ExecutionObserver, ExecutorError, ExecutorResult, WorkflowExecutor,
    WorkflowResult, MAX_BLOCK_EXECUTIONS,
};
pub use registry::ExecutionRegistry;
pub use state::{
    BlockState, BlockStatus, ExecutionId, ExecutionState, ExecutionStatus, ExecutionStatusReport,
};
pub use validator::{validate, ValidationReport};
