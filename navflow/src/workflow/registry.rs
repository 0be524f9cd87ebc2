//! Registry of asynchronous workflow executions
//!
//! Each execution runs on its own tokio task. The only shared state is the
//! map of execution states, guarded by a single mutex that is never held
//! across an await point.

use super::block::{Block, BlockGraph};
use super::executor::{BlockResult, ExecutionObserver, ExecutorError, ExecutorResult, WorkflowExecutor};
use super::state::{
    BlockState, BlockStatus, ExecutionId, ExecutionState, ExecutionStatus, ExecutionStatusReport,
};
use crate::config::Config;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct ExecutionRecord {
    state: ExecutionState,
    cancel: CancellationToken,
}

type Executions = Arc<Mutex<HashMap<ExecutionId, ExecutionRecord>>>;

fn lock(executions: &Executions) -> MutexGuard<'_, HashMap<ExecutionId, ExecutionRecord>> {
    executions
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tracks background executions for polling, cancellation and pruning
#[derive(Clone)]
pub struct ExecutionRegistry {
    executions: Executions,
    max_retained: usize,
    retention: Duration,
}

impl std::fmt::Debug for ExecutionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRegistry")
            .field("executions", &self.len())
            .field("max_retained", &self.max_retained)
            .field("retention", &self.retention)
            .finish()
    }
}

impl Default for ExecutionRegistry {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExecutionRegistry {
    /// Keep at most `max_retained` finished executions, none older than `retention`
    pub fn new(max_retained: usize, retention: Duration) -> Self {
        Self {
            executions: Arc::new(Mutex::new(HashMap::new())),
            max_retained,
            retention,
        }
    }

    /// Registry with the configured retention policy
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_retained_executions, config.execution_retention())
    }

    /// Start running `graph` on a background task
    ///
    /// Must be called from within a tokio runtime. Returns immediately.
    pub fn start(&self, executor: WorkflowExecutor, graph: BlockGraph) -> ExecutionId {
        self.prune();

        let execution_id = ExecutionId::new();
        let cancel = CancellationToken::new();
        lock(&self.executions).insert(
            execution_id,
            ExecutionRecord {
                state: ExecutionState::new(execution_id),
                cancel: cancel.clone(),
            },
        );
        tracing::info!(execution_id = %execution_id, "Started async workflow execution");

        let observer = Arc::new(RegistryObserver {
            executions: self.executions.clone(),
            execution_id,
        });
        let executions = self.executions.clone();
        tokio::spawn(async move {
            let outcome = executor.execute_observed(&graph, observer, cancel).await;

            let mut guard = lock(&executions);
            let Some(record) = guard.get_mut(&execution_id) else {
                return;
            };
            let state = &mut record.state;
            state.finished_at = Some(Utc::now());
            match outcome {
                Ok(result) => {
                    state.status = result.status;
                    state.error = result.error.clone();
                    state.result = Some(result);
                }
                Err(e) => {
                    tracing::error!(execution_id = %execution_id, "Workflow execution failed: {}", e);
                    state.status = ExecutionStatus::Failed;
                    state.error = Some(e.to_string());
                }
            }
            tracing::info!(
                execution_id = %execution_id,
                status = %state.status,
                elapsed_ms = state.elapsed_ms(),
                "Async workflow execution finished"
            );
        });

        execution_id
    }

    /// Current or last known state of an execution; never blocks on the worker
    pub fn get_status(&self, execution_id: &ExecutionId) -> Option<ExecutionStatusReport> {
        lock(&self.executions)
            .get(execution_id)
            .map(|record| record.state.report())
    }

    /// Request cancellation of a running execution
    ///
    /// Finished executions are left as they are.
    pub fn cancel(&self, execution_id: &ExecutionId) -> ExecutorResult<()> {
        let guard = lock(&self.executions);
        let record = guard
            .get(execution_id)
            .ok_or_else(|| ExecutorError::ExecutionNotFound(execution_id.to_string()))?;
        if !record.state.status.is_finished() {
            tracing::info!(execution_id = %execution_id, "Cancelling workflow execution");
            record.cancel.cancel();
        }
        Ok(())
    }

    /// Snapshot of every retained execution, oldest first
    pub fn list(&self) -> Vec<ExecutionStatusReport> {
        let mut reports: Vec<_> = lock(&self.executions)
            .values()
            .map(|record| record.state.report())
            .collect();
        reports.sort_by_key(|r| (r.started_at, r.execution_id));
        reports
    }

    /// Drop finished executions past the retention age or count; returns how many
    pub fn prune(&self) -> usize {
        let mut guard = lock(&self.executions);
        let now = Utc::now();

        let mut finished: Vec<(ExecutionId, chrono::DateTime<Utc>)> = guard
            .values()
            .filter_map(|r| r.state.finished_at.map(|at| (r.state.execution_id, at)))
            .collect();
        finished.sort_by_key(|(id, at)| (*at, *id));

        let excess = finished.len().saturating_sub(self.max_retained);
        let mut removed = 0;
        for (index, (id, finished_at)) in finished.into_iter().enumerate() {
            let expired = (now - finished_at)
                .to_std()
                .is_ok_and(|age| age > self.retention);
            if index < excess || expired {
                guard.remove(&id);
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, remaining = guard.len(), "Pruned finished executions");
        }
        removed
    }

    /// Number of retained executions
    pub fn len(&self) -> usize {
        lock(&self.executions).len()
    }

    /// Whether no executions are retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct RegistryObserver {
    executions: Executions,
    execution_id: ExecutionId,
}

impl RegistryObserver {
    fn update(&self, apply: impl FnOnce(&mut ExecutionState)) {
        if let Some(record) = lock(&self.executions).get_mut(&self.execution_id) {
            apply(&mut record.state);
        }
    }
}

impl ExecutionObserver for RegistryObserver {
    fn block_started(&self, path: &str, _block: &Block) {
        self.update(|state| {
            state.current_block_id = Some(path.to_string());
            state.block_states.insert(
                path.to_string(),
                BlockState {
                    status: BlockStatus::Running,
                    duration_ms: 0,
                    error: None,
                    message: None,
                },
            );
        });
    }

    fn block_finished(&self, path: &str, result: &BlockResult) {
        self.update(|state| {
            state.block_states.insert(
                path.to_string(),
                BlockState {
                    status: if result.success {
                        BlockStatus::Passed
                    } else {
                        BlockStatus::Failed
                    },
                    duration_ms: result.duration_ms,
                    error: result.error.clone(),
                    message: result.message.clone(),
                },
            );
        });
    }
}
