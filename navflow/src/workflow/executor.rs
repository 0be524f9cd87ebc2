//! Block graph interpreter
//!
//! One interpreter core serves both execution modes: [`WorkflowExecutor::execute`]
//! runs to completion in the caller's task, while the
//! [`ExecutionRegistry`](super::ExecutionRegistry) runs the same core on a
//! background task and publishes progress through an [`ExecutionObserver`].

use super::block::{
    Block, BlockEdgeKind, BlockGraph, BlockKind, BlockSpec, LoopBlock, LoopFailurePolicy,
    NavigationBlock,
};
use super::state::ExecutionStatus;
use super::validator::{validate, ValidationReport};
use crate::config::Config;
use crate::navigation::{ActionExecutor, NavigationExecutor, VerificationExecutor};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Structural failures that stop a workflow
///
/// Block failures are routed outcomes and never surface here.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The graph failed validation
    #[error("Workflow validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    /// The graph has no start block
    #[error("Workflow has no start block")]
    StartNotFound,
    /// The start block has no success edge but the graph has work to do
    #[error("Start block '{0}' is not connected to any block")]
    StartNotConnected(String),
    /// A block succeeded but has nowhere to go
    #[error("Block '{block_id}' succeeded but has no success edge")]
    MissingSuccessEdge {
        /// The block without a success edge
        block_id: String,
    },
    /// Too many blocks executed, most likely a cycle
    #[error("Maximum block execution limit of {limit} exceeded")]
    IterationLimitExceeded {
        /// The limit that was exceeded
        limit: usize,
    },
    /// No execution with that id is retained
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Default cap on executed blocks per run, nested blocks included
pub const MAX_BLOCK_EXECUTIONS: usize = 1000;

/// Outcome of one executed block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockResult {
    /// Block id
    pub block_id: String,
    /// Block kind
    pub kind: BlockKind,
    /// Whether the block succeeded
    pub success: bool,
    /// Time spent in the block
    pub duration_ms: u64,
    /// Informational message
    pub message: Option<String>,
    /// Failure reason
    pub error: Option<String>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowResult {
    /// Whether a success block was reached
    pub success: bool,
    /// Final status
    pub status: ExecutionStatus,
    /// Terminal block reached, if any
    pub terminal_block_id: Option<String>,
    /// Why the run failed
    pub error: Option<String>,
    /// Every executed block in order
    pub steps: Vec<BlockResult>,
    /// Wall-clock duration
    pub execution_time_ms: u64,
}

/// Receives progress while a run executes
///
/// `path` identifies the block within the whole run: its id, prefixed with
/// the ids of any enclosing loop blocks, e.g. `repeat/step1`.
pub trait ExecutionObserver: Send + Sync {
    /// A block is about to execute
    fn block_started(&self, path: &str, block: &Block);
    /// A block finished
    fn block_finished(&self, path: &str, result: &BlockResult);
}

struct NoopObserver;

impl ExecutionObserver for NoopObserver {
    fn block_started(&self, _path: &str, _block: &Block) {}
    fn block_finished(&self, _path: &str, _result: &BlockResult) {}
}

struct RunState {
    observer: Arc<dyn ExecutionObserver>,
    cancel: CancellationToken,
    executed: usize,
    steps: Vec<BlockResult>,
    /// Ids of the loop blocks enclosing the graph being run
    scope: Vec<String>,
}

impl RunState {
    fn path_of(&self, block_id: &str) -> String {
        if self.scope.is_empty() {
            return block_id.to_string();
        }
        format!("{}/{}", self.scope.join("/"), block_id)
    }
}

#[derive(Debug)]
struct GraphOutcome {
    success: bool,
    cancelled: bool,
    terminal: Option<String>,
    error: Option<String>,
}

impl GraphOutcome {
    fn passed(terminal: Option<String>) -> Self {
        Self {
            success: true,
            cancelled: false,
            terminal,
            error: None,
        }
    }

    fn failed(terminal: Option<String>, error: String) -> Self {
        Self {
            success: false,
            cancelled: false,
            terminal,
            error: Some(error),
        }
    }

    fn cancelled() -> Self {
        Self {
            success: false,
            cancelled: true,
            terminal: None,
            error: Some("Execution cancelled".to_string()),
        }
    }
}

struct BlockOutcome {
    success: bool,
    message: Option<String>,
    error: Option<String>,
}

impl BlockOutcome {
    fn passed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

type GraphFuture<'a> = Pin<Box<dyn Future<Output = ExecutorResult<GraphOutcome>> + Send + 'a>>;

/// Executes block graphs against a device
#[derive(Clone)]
pub struct WorkflowExecutor {
    actions: Arc<dyn ActionExecutor>,
    verifications: Arc<dyn VerificationExecutor>,
    navigation: Option<NavigationExecutor>,
    tree_id: Option<String>,
    max_iterations: usize,
}

impl std::fmt::Debug for WorkflowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowExecutor")
            .field("navigation", &self.navigation)
            .field("tree_id", &self.tree_id)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl WorkflowExecutor {
    /// Create an executor without navigation support
    pub fn new(
        actions: Arc<dyn ActionExecutor>,
        verifications: Arc<dyn VerificationExecutor>,
    ) -> Self {
        Self {
            actions,
            verifications,
            navigation: None,
            tree_id: None,
            max_iterations: MAX_BLOCK_EXECUTIONS,
        }
    }

    /// Enable navigation blocks, navigating within `tree_id` by default
    pub fn with_navigation(mut self, navigation: NavigationExecutor, tree_id: impl Into<String>) -> Self {
        self.navigation = Some(navigation);
        self.tree_id = Some(tree_id.into());
        self
    }

    /// Cap the number of executed blocks per run
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Apply the configured iteration cap
    pub fn with_config(self, config: &Config) -> Self {
        self.with_max_iterations(config.max_workflow_iterations)
    }

    /// Validate `graph`, failing on hard errors
    pub fn validate(&self, graph: &BlockGraph) -> ExecutorResult<ValidationReport> {
        let report = validate(graph);
        if !report.is_valid() {
            tracing::error!(errors = report.errors.len(), "Workflow validation failed");
            return Err(ExecutorError::ValidationFailed(report.errors));
        }
        for warning in &report.warnings {
            tracing::warn!("Workflow warning: {}", warning);
        }
        Ok(report)
    }

    /// Run `graph` to completion
    pub async fn execute(&self, graph: &BlockGraph) -> ExecutorResult<WorkflowResult> {
        self.execute_observed(graph, Arc::new(NoopObserver), CancellationToken::new())
            .await
    }

    /// Run `graph`, reporting progress to `observer` and stopping when `cancel` fires
    ///
    /// Cancellation is observed between blocks and during wait blocks.
    pub async fn execute_observed(
        &self,
        graph: &BlockGraph,
        observer: Arc<dyn ExecutionObserver>,
        cancel: CancellationToken,
    ) -> ExecutorResult<WorkflowResult> {
        let started = Instant::now();
        self.validate(graph)?;

        let mut run = RunState {
            observer,
            cancel,
            executed: 0,
            steps: Vec::new(),
            scope: Vec::new(),
        };
        tracing::info!(blocks = graph.blocks.len(), "Starting workflow");
        let outcome = self.run_graph(graph, &mut run).await?;

        let status = if outcome.cancelled {
            ExecutionStatus::Cancelled
        } else if outcome.success {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        let result = WorkflowResult {
            success: outcome.success,
            status,
            terminal_block_id: outcome.terminal,
            error: outcome.error,
            steps: run.steps,
            execution_time_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            status = %result.status,
            blocks = result.steps.len(),
            elapsed_ms = result.execution_time_ms,
            "Workflow finished"
        );
        Ok(result)
    }

    fn run_graph<'a>(&'a self, graph: &'a BlockGraph, run: &'a mut RunState) -> GraphFuture<'a> {
        Box::pin(async move {
            let start = graph
                .blocks_of(BlockKind::Start)
                .next()
                .ok_or(ExecutorError::StartNotFound)?;

            let mut current = match graph.next(&start.id, BlockEdgeKind::Success) {
                Some(edge) => edge.target.as_str(),
                None => {
                    let has_work = graph
                        .blocks
                        .iter()
                        .any(|b| b.kind != BlockKind::Start && !b.kind.is_terminal());
                    if has_work {
                        return Err(ExecutorError::StartNotConnected(start.id.clone()));
                    }
                    tracing::debug!("Empty workflow, nothing to execute");
                    return Ok(GraphOutcome::passed(None));
                }
            };
            let mut last_error: Option<String> = None;

            loop {
                if run.cancel.is_cancelled() {
                    return Ok(GraphOutcome::cancelled());
                }

                let block = graph.block(current).ok_or_else(|| {
                    ExecutorError::ValidationFailed(vec![format!(
                        "Edge targets unknown block '{current}'"
                    )])
                })?;

                match block.kind {
                    BlockKind::Success => return Ok(GraphOutcome::passed(Some(block.id.clone()))),
                    BlockKind::Failure => {
                        let error = last_error
                            .unwrap_or_else(|| format!("Reached failure block '{}'", block.id));
                        return Ok(GraphOutcome::failed(Some(block.id.clone()), error));
                    }
                    _ => {}
                }

                run.executed += 1;
                if run.executed > self.max_iterations {
                    tracing::error!(
                        block_id = %block.id,
                        limit = self.max_iterations,
                        "Block execution limit exceeded"
                    );
                    return Err(ExecutorError::IterationLimitExceeded {
                        limit: self.max_iterations,
                    });
                }

                let path = run.path_of(&block.id);
                run.observer.block_started(&path, block);
                let result = self.execute_block(block, run).await?;
                run.observer.block_finished(&path, &result);
                run.steps.push(result.clone());

                if run.cancel.is_cancelled() {
                    return Ok(GraphOutcome::cancelled());
                }

                if result.success {
                    last_error = None;
                    current = graph
                        .next(&block.id, BlockEdgeKind::Success)
                        .map(|e| e.target.as_str())
                        .ok_or_else(|| ExecutorError::MissingSuccessEdge {
                            block_id: block.id.clone(),
                        })?;
                } else {
                    let error = result
                        .error
                        .unwrap_or_else(|| format!("Block '{}' failed", block.id));
                    match graph.next(&block.id, BlockEdgeKind::Failure) {
                        Some(edge) => {
                            current = edge.target.as_str();
                            last_error = Some(error);
                        }
                        None => {
                            tracing::debug!(block_id = %block.id, "No failure edge, failing workflow");
                            return Ok(GraphOutcome::failed(None, error));
                        }
                    }
                }
            }
        })
    }

    async fn execute_block(&self, block: &Block, run: &mut RunState) -> ExecutorResult<BlockResult> {
        let started = Instant::now();
        tracing::trace!(block_id = %block.id, kind = %block.kind, "Executing block");

        let outcome = match block.spec() {
            Err(reason) => BlockOutcome::failed(format!("Block '{}': {}", block.id, reason)),
            Ok(BlockSpec::Start | BlockSpec::Success | BlockSpec::Failure) => {
                BlockOutcome::passed("Marker block")
            }
            Ok(BlockSpec::Action(spec)) => {
                let actions = [spec.action()];
                let batch = self
                    .actions
                    .execute_actions(&actions, &spec.retry_actions)
                    .await;
                if batch.success {
                    BlockOutcome::passed(format!("Executed {}", actions[0].describe()))
                } else {
                    BlockOutcome::failed(
                        batch
                            .error
                            .unwrap_or_else(|| format!("Action '{}' failed", spec.command)),
                    )
                }
            }
            Ok(BlockSpec::Verification(spec)) => {
                let verdict = self
                    .verifications
                    .execute_verifications(&[spec.verification()], spec.image_source_url.as_deref())
                    .await;
                if verdict.success {
                    BlockOutcome::passed(format!("Verified {}", spec.verification_type))
                } else {
                    BlockOutcome::failed(verdict.error.unwrap_or_else(|| {
                        format!("Verification '{}' failed", spec.verification_type)
                    }))
                }
            }
            Ok(BlockSpec::Navigation(spec)) => self.navigate(&block.id, &spec).await,
            Ok(BlockSpec::Loop(spec)) => self.run_loop(&block.id, &spec, run).await?,
            Ok(BlockSpec::Wait(spec)) => {
                let sleep = tokio::time::sleep(Duration::from_millis(spec.duration_ms));
                tokio::select! {
                    _ = sleep => BlockOutcome::passed(format!("Waited {} ms", spec.duration_ms)),
                    _ = run.cancel.cancelled() => BlockOutcome::failed("Wait interrupted by cancellation"),
                }
            }
        };

        let result = BlockResult {
            block_id: block.id.clone(),
            kind: block.kind,
            success: outcome.success,
            duration_ms: started.elapsed().as_millis() as u64,
            message: outcome.message,
            error: outcome.error,
        };
        if !result.success {
            tracing::warn!(
                block_id = %block.id,
                "Block failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(result)
    }

    async fn navigate(&self, block_id: &str, spec: &NavigationBlock) -> BlockOutcome {
        let Some(target) = spec.target() else {
            return BlockOutcome::failed(format!(
                "Navigation block '{block_id}' has neither a target node label nor a target node id"
            ));
        };
        let Some(navigation) = &self.navigation else {
            return BlockOutcome::failed(format!(
                "Navigation block '{block_id}' requires a navigation executor"
            ));
        };
        let Some(tree_id) = spec.tree_id.as_deref().or(self.tree_id.as_deref()) else {
            return BlockOutcome::failed(format!("Navigation block '{block_id}' has no tree"));
        };

        let result = navigation.execute(tree_id, target, None).await;
        if result.success {
            BlockOutcome::passed(format!(
                "Navigated to '{}' with {} actions",
                target, result.actions_executed
            ))
        } else {
            BlockOutcome::failed(
                result
                    .error
                    .unwrap_or_else(|| format!("Navigation to '{target}' failed")),
            )
        }
    }

    async fn run_loop(
        &self,
        block_id: &str,
        spec: &LoopBlock,
        run: &mut RunState,
    ) -> ExecutorResult<BlockOutcome> {
        if spec.graph.is_empty() {
            return Ok(BlockOutcome::passed("Loop has no blocks"));
        }

        run.scope.push(block_id.to_string());
        let outcome = self.loop_iterations(block_id, spec, run).await;
        run.scope.pop();
        outcome
    }

    async fn loop_iterations(
        &self,
        block_id: &str,
        spec: &LoopBlock,
        run: &mut RunState,
    ) -> ExecutorResult<BlockOutcome> {
        let mut last = GraphOutcome::passed(None);
        for iteration in 1..=spec.iterations {
            tracing::trace!(block_id, iteration, "Loop iteration");
            last = self.run_graph(&spec.graph, run).await?;
            if last.cancelled {
                return Ok(BlockOutcome::failed("Loop interrupted by cancellation"));
            }
            if !last.success && spec.on_failure == LoopFailurePolicy::Break {
                return Ok(BlockOutcome::failed(format!(
                    "Loop '{}' failed on iteration {}: {}",
                    block_id,
                    iteration,
                    last.error.unwrap_or_default()
                )));
            }
        }

        if last.success {
            Ok(BlockOutcome::passed(format!(
                "Completed {} iterations",
                spec.iterations
            )))
        } else {
            Ok(BlockOutcome::failed(format!(
                "Loop '{}' failed on final iteration {}: {}",
                block_id,
                spec.iterations,
                last.error.unwrap_or_default()
            )))
        }
    }
}
