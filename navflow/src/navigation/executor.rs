//! Executes navigation paths against a device

use super::collaborators::{ActionExecutor, VerificationExecutor};
use super::position::PositionTracker;
use crate::error::Result;
use crate::pathfinding::{find_path_in, PathFinder, Transition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A computed navigation with aggregate counts; produced without side effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationPlan {
    /// Root tree of the unified graph
    pub tree_id: String,
    /// Resolved start node
    pub start_node_id: String,
    /// Resolved target node
    pub target_node_id: String,
    /// Target node label
    pub target_node_label: String,
    /// Tree owning the target node
    pub target_tree_id: String,
    /// Steps in execution order
    pub transitions: Vec<Transition>,
    /// Number of steps
    pub total_transitions: usize,
    /// Device actions across all steps; virtual steps contribute none
    pub total_actions: usize,
}

impl NavigationPlan {
    /// Whether the device is already at the target
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Numbered, one step per line
    pub fn summary(&self) -> String {
        if self.transitions.is_empty() {
            return format!("Already at '{}'", self.target_node_label);
        }
        self.transitions
            .iter()
            .map(Transition::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of [`NavigationExecutor::execute`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    /// Whether the target was reached and verified
    pub success: bool,
    /// Steps attempted, skipped ones included
    pub transitions_executed: usize,
    /// Steps planned
    pub total_transitions: usize,
    /// Device actions that succeeded
    pub actions_executed: usize,
    /// Device actions planned
    pub total_actions: usize,
    /// Wall-clock time spent
    pub execution_time_ms: u64,
    /// Node the device ended at, on success
    pub final_position_node_id: Option<String>,
    /// Failure reason
    pub error: Option<String>,
    /// 1-indexed step that failed
    pub failed_transition: Option<usize>,
    /// Command of the action that failed
    pub failed_action: Option<String>,
}

impl NavigationResult {
    fn failure(error: String, elapsed: Duration) -> Self {
        Self {
            success: false,
            transitions_executed: 0,
            total_transitions: 0,
            actions_executed: 0,
            total_actions: 0,
            execution_time_ms: elapsed.as_millis() as u64,
            final_position_node_id: None,
            error: Some(error),
            failed_transition: None,
            failed_action: None,
        }
    }
}

/// Walks a computed path step by step, delegating to device collaborators
///
/// Execution is forward-only: a failed step ends the run and nothing already
/// executed is rolled back.
#[derive(Clone)]
pub struct NavigationExecutor {
    finder: PathFinder,
    team_id: String,
    actions: Arc<dyn ActionExecutor>,
    verifications: Arc<dyn VerificationExecutor>,
    position: Arc<PositionTracker>,
    apply_final_wait: bool,
    image_source_url: Option<String>,
}

impl std::fmt::Debug for NavigationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationExecutor")
            .field("team_id", &self.team_id)
            .field("apply_final_wait", &self.apply_final_wait)
            .finish()
    }
}

impl NavigationExecutor {
    /// Create an executor for one device session
    pub fn new(
        finder: PathFinder,
        team_id: impl Into<String>,
        actions: Arc<dyn ActionExecutor>,
        verifications: Arc<dyn VerificationExecutor>,
    ) -> Self {
        Self {
            finder,
            team_id: team_id.into(),
            actions,
            verifications,
            position: Arc::new(PositionTracker::new()),
            apply_final_wait: true,
            image_source_url: None,
        }
    }

    /// Share a position tracker with other components of the session
    pub fn with_position(mut self, position: Arc<PositionTracker>) -> Self {
        self.position = position;
        self
    }

    /// Whether to sleep for each edge's final wait time
    pub fn with_final_wait(mut self, apply: bool) -> Self {
        self.apply_final_wait = apply;
        self
    }

    /// Image source handed to the verification executor
    pub fn with_image_source(mut self, url: impl Into<String>) -> Self {
        self.image_source_url = Some(url.into());
        self
    }

    /// The session's position tracker
    pub fn position(&self) -> &Arc<PositionTracker> {
        &self.position
    }

    /// Team the executor navigates for
    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// Compute the plan for reaching `target` without touching the device
    ///
    /// Without `current`, the tracked position is used if it names a node of
    /// the unified graph; otherwise the graph's default start applies.
    pub fn preview(
        &self,
        tree_id: &str,
        target: &str,
        current: Option<&str>,
    ) -> Result<NavigationPlan> {
        let graph = self.finder.graph(tree_id, &self.team_id)?;

        let tracked = self.position.get().current_node_id;
        let start = match current {
            Some(current) => Some(current.to_string()),
            None => tracked.filter(|id| graph.contains_node(id)),
        };

        let path = find_path_in(&graph, tree_id, target, start.as_deref())?;
        let total_actions = path
            .transitions
            .iter()
            .map(|t| t.device_actions().len())
            .sum();

        Ok(NavigationPlan {
            tree_id: tree_id.to_string(),
            start_node_id: path.start.id.to_string(),
            target_node_id: path.target.id.to_string(),
            target_node_label: path.target.label.clone(),
            target_tree_id: path.target.tree_id.to_string(),
            total_transitions: path.transitions.len(),
            total_actions,
            transitions: path.transitions,
        })
    }

    /// Navigate the device to `target`
    pub async fn execute(
        &self,
        tree_id: &str,
        target: &str,
        current: Option<&str>,
    ) -> NavigationResult {
        let started = Instant::now();

        let plan = match self.preview(tree_id, target, current) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(tree_id, target, "Navigation planning failed: {}", e);
                return NavigationResult::failure(e.to_string(), started.elapsed());
            }
        };

        tracing::info!(
            tree_id,
            target = %plan.target_node_id,
            transitions = plan.total_transitions,
            actions = plan.total_actions,
            "Starting navigation"
        );

        let mut result = NavigationResult {
            success: false,
            transitions_executed: 0,
            total_transitions: plan.total_transitions,
            actions_executed: 0,
            total_actions: plan.total_actions,
            execution_time_ms: 0,
            final_position_node_id: None,
            error: None,
            failed_transition: None,
            failed_action: None,
        };

        for transition in &plan.transitions {
            result.transitions_executed += 1;

            let actions = transition.device_actions();
            if actions.is_empty() {
                tracing::trace!(
                    step = transition.step_number,
                    edge_id = %transition.edge_id,
                    is_virtual = transition.is_virtual,
                    "Step has no device actions"
                );
            } else {
                tracing::trace!(
                    step = transition.step_number,
                    from = %transition.from_node_id,
                    to = %transition.to_node_id,
                    "Executing step"
                );
                let batch = self
                    .actions
                    .execute_actions(actions, &transition.retry_actions)
                    .await;
                result.actions_executed += batch.passed_count.min(actions.len());

                if !batch.success {
                    let reason = batch.error.unwrap_or_else(|| "action failed".to_string());
                    tracing::warn!(
                        step = transition.step_number,
                        node_id = %transition.to_node_id,
                        "Navigation step failed: {}",
                        reason
                    );
                    result.error = Some(format!(
                        "Step {} ({} → {}) failed: {}",
                        transition.step_number,
                        transition.from_node_label,
                        transition.to_node_label,
                        reason
                    ));
                    result.failed_transition = Some(transition.step_number);
                    result.failed_action = batch.failed_action;
                    result.execution_time_ms = started.elapsed().as_millis() as u64;
                    return result;
                }
            }

            if self.apply_final_wait && transition.final_wait_time_ms > 0 {
                tokio::time::sleep(Duration::from_millis(transition.final_wait_time_ms)).await;
            }
        }

        if let Some(last) = plan.transitions.last() {
            if !last.verifications.is_empty() {
                let verdict = self
                    .verifications
                    .execute_verifications(&last.verifications, self.image_source_url.as_deref())
                    .await;
                if !verdict.success {
                    let reason = verdict
                        .error
                        .unwrap_or_else(|| "verification failed".to_string());
                    tracing::warn!(node_id = %plan.target_node_id, "Target verification failed: {}", reason);
                    result.error = Some(format!(
                        "Verification of '{}' failed: {}",
                        plan.target_node_label, reason
                    ));
                    result.failed_transition = Some(last.step_number);
                    result.execution_time_ms = started.elapsed().as_millis() as u64;
                    return result;
                }
            }
        }

        self.position.update(
            plan.target_node_id.clone(),
            plan.target_node_label.clone(),
            plan.target_tree_id.clone(),
        );
        result.success = true;
        result.final_position_node_id = Some(plan.target_node_id.clone());
        result.execution_time_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            tree_id,
            node_id = %plan.target_node_id,
            actions = result.actions_executed,
            elapsed_ms = result.execution_time_ms,
            "Navigation complete"
        );
        result
    }
}
