//! Loader over a directory of JSON files
//!
//! Layout:
//!
//! ```text
//! <dir>/trees/*.json        one TreeData per file
//! <dir>/testcases/*.json    one block graph per file, named after the test case
//! <dir>/interfaces.json     optional {"interface name": "root tree id"}
//! ```
//!
//! If `<dir>/<team_id>/` exists it is used instead of `<dir>`.

use super::TreeLoader;
use crate::error::{LoaderResultExt, NavigationError, Result};
use crate::graph::TreeData;
use crate::workflow::BlockGraph;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Reads trees and test cases from JSON files
#[derive(Debug, Clone)]
pub struct JsonDirectoryLoader {
    dir: PathBuf,
}

impl JsonDirectoryLoader {
    /// Create a loader over `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn base_dir(&self, team_id: &str) -> PathBuf {
        let team_dir = self.dir.join(team_id);
        if !team_id.is_empty() && team_dir.is_dir() {
            team_dir
        } else {
            self.dir.clone()
        }
    }

    async fn read_trees(&self, team_id: &str) -> Result<Vec<TreeData>> {
        let trees_dir = self.base_dir(team_id).join("trees");
        let mut trees = Vec::new();
        for path in json_files(&trees_dir).await? {
            let tree: TreeData = read_json(&path).await?;
            trees.push(tree);
        }
        Ok(trees)
    }
}

async fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .database_context(&format!("reading {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .database_context(&format!("reading {}", dir.display()))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .database_context(&format!("reading {}", path.display()))?;
    serde_json::from_str(&content).database_context(&format!("parsing {}", path.display()))
}

/// Order `trees` as the hierarchy under `root_tree_id`, breadth first
///
/// Trees whose parent chain does not reach the root are left out.
pub(crate) fn assemble_hierarchy(root_tree_id: &str, trees: Vec<TreeData>) -> Result<Vec<TreeData>> {
    let mut by_id: HashMap<String, TreeData> = HashMap::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for tree in trees {
        if let Some(parent) = &tree.parent_tree_id {
            children
                .entry(parent.clone())
                .or_default()
                .push(tree.tree_id.clone());
        }
        by_id.insert(tree.tree_id.clone(), tree);
    }
    for ids in children.values_mut() {
        ids.sort();
    }

    if !by_id.contains_key(root_tree_id) {
        return Err(NavigationError::tree(root_tree_id, "Root tree not found"));
    }

    let mut ordered = Vec::new();
    let mut queue = VecDeque::from([(root_tree_id.to_string(), 0u32)]);
    while let Some((tree_id, depth)) = queue.pop_front() {
        let Some(mut tree) = by_id.remove(&tree_id) else {
            continue;
        };
        if tree.tree_depth != depth {
            tracing::debug!(
                tree_id = %tree.tree_id,
                stored = tree.tree_depth,
                actual = depth,
                "Correcting stored tree depth"
            );
            tree.tree_depth = depth;
        }
        if let Some(ids) = children.get(&tree_id) {
            queue.extend(ids.iter().map(|id| (id.clone(), depth + 1)));
        }
        ordered.push(tree);
    }
    Ok(ordered)
}

#[async_trait]
impl TreeLoader for JsonDirectoryLoader {
    async fn load_tree_hierarchy(&self, root_tree_id: &str, team_id: &str) -> Result<Vec<TreeData>> {
        let trees = self.read_trees(team_id).await?;
        let hierarchy = assemble_hierarchy(root_tree_id, trees)?;
        tracing::debug!(
            tree_id = root_tree_id,
            team_id,
            trees = hierarchy.len(),
            "Loaded tree hierarchy"
        );
        Ok(hierarchy)
    }

    async fn load_tree_by_interface(&self, interface_name: &str, team_id: &str) -> Result<TreeData> {
        let interfaces_path = self.base_dir(team_id).join("interfaces.json");
        let mapped: Option<String> = if tokio::fs::try_exists(&interfaces_path)
            .await
            .unwrap_or(false)
        {
            let interfaces: HashMap<String, String> = read_json(&interfaces_path).await?;
            interfaces.get(interface_name).cloned()
        } else {
            None
        };

        let trees = self.read_trees(team_id).await?;
        let found = match mapped {
            Some(root_id) => trees.into_iter().find(|t| t.tree_id == root_id),
            None => trees
                .into_iter()
                .find(|t| t.parent_tree_id.is_none() && t.name == interface_name),
        };
        found.ok_or_else(|| {
            NavigationError::tree(
                interface_name,
                format!("No root tree for user interface '{interface_name}'"),
            )
        })
    }

    async fn load_test_case(&self, name: &str, team_id: &str) -> Result<BlockGraph> {
        let path = self
            .base_dir(team_id)
            .join("testcases")
            .join(format!("{name}.json"));
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(NavigationError::Database(format!(
                "Test case '{name}' not found for team '{team_id}'"
            )));
        }
        read_json(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeData;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn write_tree(dir: &Path, tree: &TreeData) {
        let trees = dir.join("trees");
        std::fs::create_dir_all(&trees).unwrap();
        std::fs::write(
            trees.join(format!("{}.json", tree.tree_id)),
            serde_json::to_string(tree).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_assemble_hierarchy_orders_breadth_first() {
        let root = TreeData::new("root", "Root");
        let b = TreeData::new("b", "B").with_parent("root", "n1", 1);
        let a = TreeData::new("a", "A").with_parent("root", "n2", 1);
        let deep = TreeData::new("deep", "Deep").with_parent("a", "a1", 5);
        let orphan = TreeData::new("orphan", "Orphan").with_parent("missing", "x", 1);

        let ordered = assemble_hierarchy("root", vec![deep, orphan, b, root, a]).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|t| t.tree_id.as_str()).collect();
        assert_eq!(ids, vec!["root", "a", "b", "deep"]);
        assert_eq!(ordered[3].tree_depth, 2);
    }

    #[test]
    fn test_assemble_hierarchy_missing_root() {
        let err = assemble_hierarchy("root", vec![]).unwrap_err();
        assert!(matches!(err, NavigationError::NavigationTree { .. }));
    }

    #[tokio::test]
    async fn test_load_hierarchy_from_directory() {
        let dir = TempDir::new().unwrap();
        let (root, child) = two_level_hierarchy();
        write_tree(dir.path(), &root);
        write_tree(dir.path(), &child);

        let loader = JsonDirectoryLoader::new(dir.path());
        let trees = loader.load_tree_hierarchy("main", "team").await.unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].tree_id, "main");
    }

    #[tokio::test]
    async fn test_team_directory_takes_precedence() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path(), &linear_tree());
        let mut team_tree = TreeData::new("main", "Team Main");
        team_tree.nodes.push(NodeData::new("x", "X"));
        write_tree(&dir.path().join("team-a"), &team_tree);

        let loader = JsonDirectoryLoader::new(dir.path());
        let trees = loader.load_tree_hierarchy("main", "team-a").await.unwrap();
        assert_eq!(trees[0].name, "Team Main");
        let trees = loader.load_tree_hierarchy("main", "team-b").await.unwrap();
        assert_eq!(trees[0].name, "Main");
    }

    #[tokio::test]
    async fn test_missing_trees_dir_is_database_error() {
        let dir = TempDir::new().unwrap();
        let loader = JsonDirectoryLoader::new(dir.path());
        let err = loader.load_tree_hierarchy("main", "team").await.unwrap_err();
        assert!(matches!(err, NavigationError::Database(_)));
    }

    #[tokio::test]
    async fn test_load_tree_by_interface() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path(), &linear_tree());

        let loader = JsonDirectoryLoader::new(dir.path());
        let tree = loader.load_tree_by_interface("Main", "team").await.unwrap();
        assert_eq!(tree.tree_id, "main");

        std::fs::write(dir.path().join("interfaces.json"), r#"{"horizon_tv": "main"}"#).unwrap();
        let tree = loader.load_tree_by_interface("horizon_tv", "team").await.unwrap();
        assert_eq!(tree.tree_id, "main");

        assert!(loader.load_tree_by_interface("unknown", "team").await.is_err());
    }

    #[tokio::test]
    async fn test_load_test_case() {
        let dir = TempDir::new().unwrap();
        let cases = dir.path().join("testcases");
        std::fs::create_dir_all(&cases).unwrap();
        std::fs::write(
            cases.join("smoke.json"),
            r#"{"nodes":[{"id":"start","type":"start"},{"id":"ok","type":"success"}],
                "edges":[{"source":"start","target":"ok","type":"success"}]}"#,
        )
        .unwrap();

        let loader = JsonDirectoryLoader::new(dir.path());
        let graph = loader.load_test_case("smoke", "team").await.unwrap();
        assert_eq!(graph.blocks.len(), 2);
        assert!(loader.load_test_case("missing", "team").await.is_err());
    }
}
