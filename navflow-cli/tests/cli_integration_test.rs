//! End-to-end tests of the navflow binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAIN_TREE: &str = r#"{
    "treeId": "main",
    "name": "Main",
    "nodes": [
        {"id": "a", "label": "A", "isEntryPoint": true},
        {"id": "b", "label": "B"},
        {"id": "c", "label": "C"}
    ],
    "edges": [
        {"sourceNodeId": "a", "targetNodeId": "b",
         "actionSets": [{"id": "a_b", "actions": [{"command": "press_key", "params": {"key": "DOWN"}}]}],
         "defaultActionSetId": "a_b"},
        {"sourceNodeId": "b", "targetNodeId": "c",
         "actionSets": [{"id": "b_c", "actions": [{"command": "press_key", "params": {"key": "DOWN"}}]}],
         "defaultActionSetId": "b_c"}
    ]
}"#;

const SETTINGS_TREE: &str = r#"{
    "treeId": "settings",
    "name": "Settings",
    "parentTreeId": "main",
    "parentNodeId": "c",
    "treeDepth": 1,
    "nodes": [
        {"id": "menu", "label": "Settings Menu", "isEntryPoint": true},
        {"id": "details", "label": "Details"}
    ],
    "edges": [
        {"sourceNodeId": "menu", "targetNodeId": "details",
         "actionSets": [{"id": "open", "actions": [{"command": "press_key", "params": {"key": "OK"}}]}],
         "defaultActionSetId": "open"}
    ]
}"#;

const ACTION_WORKFLOW: &str = r#"{
    "nodes": [
        {"id": "start", "type": "start"},
        {"id": "press", "type": "action", "data": {"command": "press_key", "params": {"key": "OK"}}},
        {"id": "check", "type": "verification", "data": {"verification_type": "text_present"}},
        {"id": "passed", "type": "success"},
        {"id": "failed", "type": "failure"}
    ],
    "edges": [
        {"source": "start", "target": "press", "type": "success"},
        {"source": "press", "target": "check", "type": "success"},
        {"source": "check", "target": "passed", "type": "success"},
        {"source": "check", "target": "failed", "type": "failure"}
    ]
}"#;

const NAVIGATION_WORKFLOW: &str = r#"{
    "nodes": [
        {"id": "start", "type": "start"},
        {"id": "open_details", "type": "navigation", "data": {"target_node": "Details"}},
        {"id": "passed", "type": "success"}
    ],
    "edges": [
        {"source": "start", "target": "open_details", "type": "success"},
        {"source": "open_details", "target": "passed", "type": "success"}
    ]
}"#;

const WORKFLOW_WITH_WARNING: &str = r#"{
    "nodes": [
        {"id": "start", "type": "start"},
        {"id": "press", "type": "action", "data": {"command": "press_key"}},
        {"id": "orphan", "type": "action", "data": {"command": "press_key"}},
        {"id": "passed", "type": "success"}
    ],
    "edges": [
        {"source": "start", "target": "press", "type": "success"},
        {"source": "press", "target": "passed", "type": "success"},
        {"source": "orphan", "target": "passed", "type": "success"}
    ]
}"#;

const INVALID_WORKFLOW: &str = r#"{
    "nodes": [
        {"id": "start", "type": "start"},
        {"id": "press", "type": "action", "data": {"command": "press_key"}}
    ],
    "edges": [
        {"source": "start", "target": "press", "type": "success"}
    ]
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let trees = dir.path().join("data").join("trees");
        fs::create_dir_all(&trees).unwrap();
        fs::write(trees.join("main.json"), MAIN_TREE).unwrap();
        fs::write(trees.join("settings.json"), SETTINGS_TREE).unwrap();
        Self { dir }
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn navflow(&self) -> Command {
        let mut cmd = Command::cargo_bin("navflow").unwrap();
        cmd.arg("--cache-dir")
            .arg(self.cache_dir())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn build(&self) {
        self.navflow()
            .args(["graph", "build", "--root", "main", "--team", "qa", "--trees"])
            .arg(self.data_dir())
            .assert()
            .success();
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("navflow")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("cache"))
        .stdout(predicate::str::contains("workflow"));
}

#[test]
fn test_version() {
    Command::cargo_bin("navflow")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("navflow"));
}

#[test]
fn test_graph_build_reports_counts() {
    let ws = Workspace::new();
    ws.navflow()
        .args(["graph", "build", "--root", "main", "--team", "qa", "--trees"])
        .arg(ws.data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Built unified graph for 'main'"))
        .stdout(predicate::str::contains("5 nodes"))
        .stdout(predicate::str::contains("across 2 trees"));
}

#[test]
fn test_graph_build_with_unknown_root_is_invalid() {
    let ws = Workspace::new();
    ws.navflow()
        .args(["graph", "build", "--root", "nope", "--team", "qa", "--trees"])
        .arg(ws.data_dir())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_graph_build_with_missing_directory_fails() {
    let ws = Workspace::new();
    ws.navflow()
        .args(["graph", "build", "--root", "main", "--team", "qa", "--trees"])
        .arg(ws.dir.path().join("missing"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_graph_stats_after_build() {
    let ws = Workspace::new();
    ws.build();

    ws.navflow()
        .args(["graph", "stats", "--root", "main", "--team", "qa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes:       5"))
        .stdout(predicate::str::contains("ENTER_SUBTREE"))
        .stdout(predicate::str::contains("Settings (settings) depth 1, 2 nodes"))
        .stdout(predicate::str::contains("All nodes reachable from 'A'"));
}

#[test]
fn test_graph_path_text_preview() {
    let ws = Workspace::new();
    ws.build();

    ws.navflow()
        .args(["graph", "path", "--root", "main", "--team", "qa", "--target", "Details"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 transitions, 3 actions"))
        .stdout(predicate::str::contains("1. A → B [NORMAL] press_key(DOWN)"))
        .stdout(predicate::str::contains("[ENTER_SUBTREE]"));
}

#[test]
fn test_graph_path_json_preview() {
    let ws = Workspace::new();
    ws.build();

    let output = ws
        .navflow()
        .args([
            "graph", "path", "--root", "main", "--team", "qa", "--target", "C", "--from", "b",
            "--format", "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["start_node_id"], "b");
    assert_eq!(plan["target_node_id"], "c");
    assert_eq!(plan["total_transitions"], 1);
}

#[test]
fn test_graph_path_without_cached_graph_fails() {
    let ws = Workspace::new();
    ws.navflow()
        .args(["graph", "path", "--root", "main", "--team", "qa", "--target", "C"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("navflow graph build"));
}

#[test]
fn test_graph_path_to_unknown_target_fails() {
    let ws = Workspace::new();
    ws.build();

    ws.navflow()
        .args(["graph", "path", "--root", "main", "--team", "qa", "--target", "Nowhere"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Pathfinding error"));
}

#[test]
fn test_cache_stats_and_clear() {
    let ws = Workspace::new();
    ws.build();

    ws.navflow()
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:   1"));

    ws.navflow()
        .args(["cache", "clear", "--root", "main", "--team", "other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached graph"));

    ws.navflow()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 cached graphs"));

    ws.navflow()
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:   0"));
}

#[test]
fn test_workflow_validate_exit_codes() {
    let ws = Workspace::new();
    let valid = ws.write("valid.json", ACTION_WORKFLOW);
    let warning = ws.write("warning.json", WORKFLOW_WITH_WARNING);
    let invalid = ws.write("invalid.json", INVALID_WORKFLOW);

    ws.navflow()
        .args(["workflow", "validate", path_arg(&valid)])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Valid:"));

    ws.navflow()
        .args(["workflow", "validate", path_arg(&warning)])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("'orphan'"));

    ws.navflow()
        .args(["workflow", "validate", path_arg(&invalid)])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("No success or failure block"));
}

#[test]
fn test_workflow_validate_unparseable_file() {
    let ws = Workspace::new();
    let broken = ws.write("broken.json", "{ nope");

    ws.navflow()
        .args(["workflow", "validate", path_arg(&broken)])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid workflow file"));
}

#[test]
fn test_workflow_run_prints_progress() {
    let ws = Workspace::new();
    let file = ws.write("workflow.json", ACTION_WORKFLOW);

    ws.navflow()
        .args(["workflow", "run", path_arg(&file)])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ press (action)"))
        .stdout(predicate::str::contains("✓ check (verification)"))
        .stdout(predicate::str::contains("Workflow completed: reached 'passed'"));
}

#[test]
fn test_workflow_run_with_failing_command() {
    let ws = Workspace::new();
    let file = ws.write("workflow.json", ACTION_WORKFLOW);

    ws.navflow()
        .args(["workflow", "run", path_arg(&file), "--fail-command", "text_present"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("✗ check (verification)"))
        .stdout(predicate::str::contains("Workflow failed:"));
}

#[test]
fn test_workflow_run_json_result() {
    let ws = Workspace::new();
    let file = ws.write("workflow.json", ACTION_WORKFLOW);

    let output = ws
        .navflow()
        .args(["workflow", "run", path_arg(&file), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["terminal_block_id"], "passed");
    assert_eq!(result["steps"].as_array().unwrap().len(), 2);
}

#[test]
fn test_workflow_run_invalid_graph_is_rejected() {
    let ws = Workspace::new();
    let file = ws.write("invalid.json", INVALID_WORKFLOW);

    ws.navflow()
        .args(["workflow", "run", path_arg(&file)])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Workflow validation failed"));
}

#[test]
fn test_workflow_run_with_navigation() {
    let ws = Workspace::new();
    ws.build();
    let file = ws.write("navigate.json", NAVIGATION_WORKFLOW);

    ws.navflow()
        .args(["workflow", "run", path_arg(&file), "--tree", "main", "--team", "qa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ open_details (navigation)"));
}

#[test]
fn test_workflow_run_with_uncached_tree_fails() {
    let ws = Workspace::new();
    let file = ws.write("navigate.json", NAVIGATION_WORKFLOW);

    ws.navflow()
        .args(["workflow", "run", path_arg(&file), "--tree", "main", "--team", "qa"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("navflow graph build"));
}
