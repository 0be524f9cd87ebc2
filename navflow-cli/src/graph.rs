//! `navflow graph` commands

use crate::cli::{GraphSubcommand, OutputFormat};
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::{EXIT_SUCCESS, EXIT_WARNING};
use colored::*;
use navflow::graph::GraphAnalyzer;
use navflow::navigation::SimulatedDevice;
use navflow::pathfinding::default_start;
use navflow::{
    populate_cache, Config, GraphCache, JsonDirectoryLoader, NavigationExecutor, PathFinder,
    UnifiedGraph,
};
use std::path::Path;
use std::sync::Arc;

pub async fn run_graph_command(subcommand: GraphSubcommand, config: &Config) -> CliResult<i32> {
    let cache = GraphCache::from_config(config)?;
    match subcommand {
        GraphSubcommand::Build { trees, root, team } => build(&cache, &trees, &root, &team).await,
        GraphSubcommand::Stats { root, team } => stats(&cache, &root, &team),
        GraphSubcommand::Path {
            root,
            team,
            target,
            from,
            format,
        } => path(cache, &root, &team, &target, from.as_deref(), format),
    }
}

async fn build(cache: &GraphCache, trees: &Path, root: &str, team: &str) -> CliResult<i32> {
    if !trees.is_dir() {
        return Err(CliError::new(
            format!("Tree directory '{}' does not exist", trees.display()),
            EXIT_WARNING,
        ));
    }

    let loader = JsonDirectoryLoader::new(trees);
    let graph = populate_cache(&loader, cache, root, team).await?;
    let analyzer = GraphAnalyzer::new(&graph);

    println!(
        "{} unified graph for '{}' (team '{}'): {} nodes, {} edges across {} trees",
        "Built".green().bold(),
        root,
        team,
        graph.node_count(),
        graph.edge_count(),
        analyzer.trees().len()
    );
    println!("Cached in {}", cache.stats()?.location);
    Ok(EXIT_SUCCESS)
}

fn cached_graph(cache: &GraphCache, root: &str, team: &str) -> CliResult<UnifiedGraph> {
    cache.get(root, team).ok_or_else(|| {
        CliError::new(
            format!(
                "No cached graph for tree '{}' (team '{}'). Run `navflow graph build` first.",
                root, team
            ),
            EXIT_WARNING,
        )
    })
}

fn stats(cache: &GraphCache, root: &str, team: &str) -> CliResult<i32> {
    let graph = cached_graph(cache, root, team)?;
    let analyzer = GraphAnalyzer::new(&graph);

    let title = format!("Unified graph '{}' (team '{}')", root, team);
    println!("{}", title.as_str().bold());
    println!("  Nodes:       {}", graph.node_count());
    println!(
        "  Edges:       {} ({} from tree data)",
        graph.edge_count(),
        analyzer.real_edge_count()
    );
    for (kind, count) in analyzer.edges_by_kind() {
        println!("    {:<14} {}", kind, count);
    }

    println!("  Trees:");
    for tree in analyzer.trees() {
        println!(
            "    {}{} ({}) depth {}, {} nodes",
            "  ".repeat(tree.depth as usize),
            tree.name,
            tree.tree_id,
            tree.depth,
            tree.node_count
        );
    }

    if let Some(start) = default_start(&graph) {
        let unreachable = analyzer.unreachable_from(start.id.as_str());
        if unreachable.is_empty() {
            println!("  All nodes reachable from '{}'", start.label);
        } else {
            println!(
                "  {} {} nodes unreachable from '{}'",
                "Warning:".yellow(),
                unreachable.len(),
                start.label
            );
            for id in unreachable {
                println!("    - {}", id);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

fn path(
    cache: GraphCache,
    root: &str,
    team: &str,
    target: &str,
    from: Option<&str>,
    format: OutputFormat,
) -> CliResult<i32> {
    cached_graph(&cache, root, team)?;

    let device = Arc::new(SimulatedDevice::new());
    let navigation = NavigationExecutor::new(PathFinder::new(cache), team, device.clone(), device);
    let plan = navigation.preview(root, target, from)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan).cli_general_error()?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} → {} ({} transitions, {} actions)",
                "Path".bold(),
                plan.start_node_id,
                plan.target_node_label,
                plan.total_transitions,
                plan.total_actions
            );
            println!("{}", plan.summary());
        }
    }
    Ok(EXIT_SUCCESS)
}
