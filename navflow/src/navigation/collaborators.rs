//! Device-facing collaborators
//!
//! Device controllers live outside this crate. They are reached through
//! these traits, which already encapsulate any low-level retry and timeout.

use crate::graph::{Action, Verification};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of executing a batch of actions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionBatchResult {
    /// Whether every action succeeded, retries included
    pub success: bool,
    /// Error message on failure
    pub error: Option<String>,
    /// Number of actions that succeeded before the batch ended
    pub passed_count: usize,
    /// Command of the action that failed, if reported
    pub failed_action: Option<String>,
}

impl ActionBatchResult {
    /// A successful batch
    pub fn passed(passed_count: usize) -> Self {
        Self {
            success: true,
            error: None,
            passed_count,
            failed_action: None,
        }
    }

    /// A failed batch
    pub fn failed(
        passed_count: usize,
        failed_action: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            passed_count,
            failed_action: Some(failed_action.into()),
        }
    }
}

/// Outcome of executing a batch of verifications
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationBatchResult {
    /// Whether every verification passed
    pub success: bool,
    /// Error message on failure
    pub error: Option<String>,
    /// Number of verifications that passed
    pub passed_count: usize,
}

impl VerificationBatchResult {
    /// A passing batch
    pub fn passed(passed_count: usize) -> Self {
        Self {
            success: true,
            error: None,
            passed_count,
        }
    }

    /// A failing batch
    pub fn failed(passed_count: usize, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            passed_count,
        }
    }
}

/// Executes device actions against the currently bound device
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute `actions`, falling back to `retry_actions` as the controller sees fit
    async fn execute_actions(
        &self,
        actions: &[Action],
        retry_actions: &[Action],
    ) -> ActionBatchResult;
}

/// Executes verifications against the currently bound device
#[async_trait]
pub trait VerificationExecutor: Send + Sync {
    /// Execute `verifications`, optionally against a captured image
    async fn execute_verifications(
        &self,
        verifications: &[Verification],
        image_source_url: Option<&str>,
    ) -> VerificationBatchResult;
}
