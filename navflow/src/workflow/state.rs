//! Progress state of workflow executions

use super::executor::WorkflowResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique identifier for an asynchronous execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Ulid);

impl ExecutionId {
    /// Create a new random execution id
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExecutionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| format!("Invalid execution id '{s}': {e}"))
    }
}

/// Lifecycle status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Still running
    Running,
    /// Reached a success block
    Completed,
    /// Reached a failure block or stopped on a structural error
    Failed,
    /// Stopped by a cancellation request
    Cancelled,
}

impl ExecutionStatus {
    /// Whether the execution has stopped
    pub fn is_finished(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        })
    }
}

/// Status of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    /// Executing now
    Running,
    /// Finished successfully
    Passed,
    /// Finished with a failure
    Failed,
}

/// Last known state of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    /// Block status
    pub status: BlockStatus,
    /// Time spent in the block
    pub duration_ms: u64,
    /// Failure reason
    pub error: Option<String>,
    /// Informational message
    pub message: Option<String>,
}

/// Mutable state of an asynchronous execution
///
/// Written by the worker after every block, read by pollers.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionState {
    /// Execution id
    pub execution_id: ExecutionId,
    /// Current status
    pub status: ExecutionStatus,
    /// Path of the block being executed, or the last one executed
    pub current_block_id: Option<String>,
    /// Per-block state, keyed by block path (`repeat/step1` inside loop `repeat`)
    pub block_states: HashMap<String, BlockState>,
    /// Final result once finished
    pub result: Option<WorkflowResult>,
    /// Error that ended the execution
    pub error: Option<String>,
    /// When the execution started
    pub started_at: DateTime<Utc>,
    /// When the execution finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionState {
    /// A freshly started execution
    pub fn new(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            status: ExecutionStatus::Running,
            current_block_id: None,
            block_states: HashMap::new(),
            result: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Milliseconds from start to finish, or to now while running
    pub fn elapsed_ms(&self) -> u64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Snapshot for pollers
    pub fn report(&self) -> ExecutionStatusReport {
        ExecutionStatusReport {
            execution_id: self.execution_id,
            status: self.status,
            current_block_id: self.current_block_id.clone(),
            block_states: self.block_states.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            elapsed_ms: self.elapsed_ms(),
        }
    }
}

/// What a poller sees
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStatusReport {
    /// Execution id
    pub execution_id: ExecutionId,
    /// Current status
    pub status: ExecutionStatus,
    /// Path of the block being executed, or the last one executed
    pub current_block_id: Option<String>,
    /// Per-block state, keyed by block path (`repeat/step1` inside loop `repeat`)
    pub block_states: HashMap<String, BlockState>,
    /// Final result once finished
    pub result: Option<WorkflowResult>,
    /// Error that ended the execution
    pub error: Option<String>,
    /// When the execution started
    pub started_at: DateTime<Utc>,
    /// Elapsed time computed at read
    pub elapsed_ms: u64,
}
