//! Current device position within the navigation trees

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Where the device is believed to be
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Current node id
    pub current_node_id: Option<String>,
    /// Current node label
    pub current_node_label: Option<String>,
    /// Tree of the current node
    pub current_tree_id: Option<String>,
}

impl Position {
    /// Whether nothing is known about the position
    pub fn is_unknown(&self) -> bool {
        self.current_node_id.is_none()
    }
}

/// Per-device position, empty at session start
///
/// Only the navigation executor updates it after a successful navigation.
/// Clear it when the device switches to a different app interface.
#[derive(Debug, Default)]
pub struct PositionTracker {
    position: Mutex<Position>,
}

impl PositionTracker {
    /// Create a tracker with an unknown position
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current position
    pub fn get(&self) -> Position {
        self.position
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Record a new position
    pub fn update(
        &self,
        node_id: impl Into<String>,
        node_label: impl Into<String>,
        tree_id: impl Into<String>,
    ) {
        let mut position = self
            .position
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *position = Position {
            current_node_id: Some(node_id.into()),
            current_node_label: Some(node_label.into()),
            current_tree_id: Some(tree_id.into()),
        };
    }

    /// Forget the position
    pub fn clear(&self) {
        *self
            .position
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Position::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_lifecycle() {
        let tracker = PositionTracker::new();
        assert!(tracker.get().is_unknown());

        tracker.update("c", "Home", "main");
        let position = tracker.get();
        assert_eq!(position.current_node_id.as_deref(), Some("c"));
        assert_eq!(position.current_node_label.as_deref(), Some("Home"));
        assert_eq!(position.current_tree_id.as_deref(), Some("main"));

        tracker.clear();
        assert_eq!(tracker.get(), Position::default());
    }
}
