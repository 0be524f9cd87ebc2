//! A device stand-in for dry runs and tests
//!
//! Every action and verification succeeds unless its command or
//! verification type was marked as failing. Calls are recorded in order.

use super::collaborators::{
    ActionBatchResult, ActionExecutor, VerificationBatchResult, VerificationExecutor,
};
use crate::graph::{Action, Verification};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Simulated action and verification controller
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl SimulatedDevice {
    /// A device on which everything succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every action with `command` (or verification of that type) fail
    pub fn failing(mut self, command: impl Into<String>) -> Self {
        self.failing.insert(command.into());
        self
    }

    /// Make every listed command fail
    pub fn failing_all<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(commands.into_iter().map(Into::into));
        self
    }

    /// Recorded calls, e.g. `action:press_key(DOWN)` or `verify:text_present`
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    fn run_batch(&self, actions: &[Action]) -> Result<usize, (usize, String)> {
        for (index, action) in actions.iter().enumerate() {
            self.record(format!("action:{}", action.describe()));
            if self.failing.contains(&action.command) {
                return Err((index, action.command.clone()));
            }
        }
        Ok(actions.len())
    }
}

#[async_trait]
impl ActionExecutor for SimulatedDevice {
    async fn execute_actions(
        &self,
        actions: &[Action],
        retry_actions: &[Action],
    ) -> ActionBatchResult {
        match self.run_batch(actions) {
            Ok(passed) => ActionBatchResult::passed(passed),
            Err((passed, command)) if retry_actions.is_empty() => ActionBatchResult::failed(
                passed,
                command.clone(),
                format!("Action '{command}' failed"),
            ),
            Err((passed, command)) => match self.run_batch(retry_actions) {
                Ok(_) => ActionBatchResult::passed(passed),
                Err((_, retry_command)) => ActionBatchResult::failed(
                    passed,
                    command.clone(),
                    format!("Action '{command}' failed and retry '{retry_command}' failed"),
                ),
            },
        }
    }
}

#[async_trait]
impl VerificationExecutor for SimulatedDevice {
    async fn execute_verifications(
        &self,
        verifications: &[Verification],
        _image_source_url: Option<&str>,
    ) -> VerificationBatchResult {
        for (index, verification) in verifications.iter().enumerate() {
            self.record(format!("verify:{}", verification.verification_type));
            if self.failing.contains(&verification.verification_type) {
                return VerificationBatchResult::failed(
                    index,
                    format!("Verification '{}' failed", verification.verification_type),
                );
            }
        }
        VerificationBatchResult::passed(verifications.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{press_key, text_present};

    #[tokio::test]
    async fn test_all_actions_pass_by_default() {
        let device = SimulatedDevice::new();
        let result = device
            .execute_actions(&[press_key("DOWN"), press_key("OK")], &[])
            .await;
        assert!(result.success);
        assert_eq!(result.passed_count, 2);
        assert_eq!(
            device.calls(),
            vec!["action:press_key(DOWN)", "action:press_key(OK)"]
        );
    }

    #[tokio::test]
    async fn test_failing_command_reports_failure() {
        let device = SimulatedDevice::new().failing("tap");
        let actions = [press_key("DOWN"), Action::new("tap")];
        let result = device.execute_actions(&actions, &[]).await;
        assert!(!result.success);
        assert_eq!(result.passed_count, 1);
        assert_eq!(result.failed_action.as_deref(), Some("tap"));
    }

    #[tokio::test]
    async fn test_retry_actions_recover() {
        let device = SimulatedDevice::new().failing("tap");
        let result = device
            .execute_actions(&[Action::new("tap")], &[press_key("OK")])
            .await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_failing_verification() {
        let device = SimulatedDevice::new().failing_all(["image_match"]);
        let passing = device
            .execute_verifications(&[text_present("Home")], None)
            .await;
        assert!(passing.success);

        let failing = device
            .execute_verifications(&[Verification::new("image_match")], None)
            .await;
        assert!(!failing.success);
        assert!(failing.error.unwrap().contains("image_match"));
    }
}
