
use navflow::graph::EdgeKind;
use navflow::loader::{populate_cache, JsonDirectoryLoader, TreeLoader};
use navflow::navigation::SimulatedDevice;
use navflow::{GraphCache, NavigationError, NavigationExecutor, PathFinder, WorkflowExecutor};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::data_dir;

async fn warmed_cache(dir: &std::path::Path) -> GraphCache {
    let cache = GraphCache::in_memory(Duration::from_secs(3600));
    let loader = JsonDirectoryLoader::new(dir);
    populate_cache(&loader, &cache, "main", "team").await.unwrap();
    cache
}

fn executor(cache: GraphCache, device: Arc<SimulatedDevice>) -> NavigationExecutor {
    NavigationExecutor::new(PathFinder::new(cache), "team", device.clone(), device)
        .with_final_wait(false)
}

#[tokio::test]
async fn test_navigate_to_c_from_entry_point() {
    let dir = data_dir();
    let cache = warmed_cache(dir.path()).await;
    let device = Arc::new(SimulatedDevice::new());
    let nav = executor(cache, device.clone());

    let plan = nav.preview("main", "C", None).unwrap();
    assert_eq!(plan.start_node_id, "a");
    assert_eq!(plan.total_transitions, 2);
    assert_eq!(plan.total_actions, 2);

    let result = nav.execute("main", "C", None).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.actions_executed, 2);
    assert_eq!(result.final_position_node_id.as_deref(), Some("c"));
    assert_eq!(
        device.calls(),
        vec![
            "action:press_key(DOWN)",
            "action:press_key(DOWN)",
            "verify:text_present"
        ]
    );
    assert_eq!(nav.position().get().current_node_label.as_deref(), Some("C"));
}

#[tokio::test]
async fn test_failed_verification_leaves_position_unchanged() {
    let dir = data_dir();
    let cache = warmed_cache(dir.path()).await;
    let device = Arc::new(SimulatedDevice::new().failing("text_present"));
    let nav = executor(cache, device);

    let result = nav.execute("main", "C", None).await;
    assert!(!result.success);
    assert_eq!(result.transitions_executed, 2);
    assert!(result.error.unwrap().contains("text_present"));
    assert!(nav.position().get().is_unknown());
}

#[tokio::test]
async fn test_already_there_executes_nothing() {
    let dir = data_dir();
    let cache = warmed_cache(dir.path()).await;
    let device = Arc::new(SimulatedDevice::new());
    let nav = executor(cache, device.clone());

    assert!(nav.execute("main", "C", None).await.success);
    let calls_before = device.calls().len();

    let again = nav.execute("main", "C", None).await;
    assert!(again.success);
    assert_eq!(again.total_transitions, 0);
    assert_eq!(again.actions_executed, 0);
    assert_eq!(device.calls().len(), calls_before);
}

#[tokio::test]
async fn test_cross_tree_navigation_uses_virtual_edges() {
    let dir = data_dir();
    let cache = warmed_cache(dir.path()).await;
    let device = Arc::new(SimulatedDevice::new());
    let nav = executor(cache, device.clone());

    let plan = nav.preview("main", "Details", Some("c")).unwrap();
    assert_eq!(plan.total_transitions, 2);
    assert_eq!(plan.total_actions, 1);
    assert_eq!(plan.transitions[0].edge_kind, EdgeKind::EnterSubtree);
    assert!(plan.transitions[0].tree_context_changed);
    assert_eq!(plan.target_tree_id, "settings");

    let result = nav.execute("main", "details", Some("c")).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.transitions_executed, 2);
    assert_eq!(device.calls(), vec!["action:press_key(OK)"]);
}

#[tokio::test]
async fn test_exit_subtree_then_reverse_edge() {
    let dir = data_dir();
    let cache = warmed_cache(dir.path()).await;
    let nav = executor(cache, Arc::new(SimulatedDevice::new()));

    let plan = nav.preview("main", "B", Some("menu")).unwrap();
    assert_eq!(plan.total_transitions, 2);
    assert_eq!(plan.transitions[0].edge_kind, EdgeKind::ExitSubtree);
    assert_eq!(plan.transitions[1].actions[0].describe(), "press_key(UP)");
    assert!(plan.summary().starts_with("1. Settings Menu → C"));
}

#[tokio::test]
async fn test_uncached_tree_is_a_cache_error() {
    let finder = PathFinder::new(GraphCache::in_memory(Duration::from_secs(60)));
    let err = finder.find_path("main", "C", "team", None).unwrap_err();
    assert!(matches!(err, NavigationError::UnifiedCache { .. }));
}

#[tokio::test]
async fn test_unknown_target_is_a_pathfinding_error() {
    let dir = data_dir();
    let finder = PathFinder::new(warmed_cache(dir.path()).await);
    let err = finder.find_path("main", "Nowhere", "team", None).unwrap_err();
    assert!(matches!(err, NavigationError::Pathfinding { .. }));
    assert!(err.to_string().contains("main"));
}

#[tokio::test]
async fn test_interface_lookup_and_saved_test_case() {
    let dir = data_dir();
    let loader = JsonDirectoryLoader::new(dir.path());
    let root = loader.load_tree_by_interface("horizon_tv", "team").await.unwrap();
    assert_eq!(root.tree_id, "main");

    let cache = warmed_cache(dir.path()).await;
    let device = Arc::new(SimulatedDevice::new());
    let nav = executor(cache, device.clone());
    let workflow = WorkflowExecutor::new(device.clone(), device.clone()).with_navigation(nav, "main");

    let graph = loader.load_test_case("smoke", "team").await.unwrap();
    let result = workflow.execute(&graph).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.terminal_block_id.as_deref(), Some("passed"));
    let executed: Vec<&str> = result.steps.iter().map(|s| s.block_id.as_str()).collect();
    assert_eq!(executed, vec!["go_home", "v", "v", "check"]);
    assert_eq!(
        device.calls().iter().filter(|c| *c == "verify:text_present").count(),
        3
    );
}
