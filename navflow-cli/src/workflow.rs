//! `navflow workflow` commands

use crate::cli::{OutputFormat, WorkflowSubcommand};
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_WARNING};
use anyhow::Context;
use colored::*;
use navflow::navigation::SimulatedDevice;
use navflow::workflow::{Block, BlockResult, ExecutionObserver, ExecutionStatus};
use navflow::{
    validate, BlockGraph, Config, GraphCache, NavigationExecutor, PathFinder, ValidationReport,
    WorkflowExecutor, WorkflowResult,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run_workflow_command(
    subcommand: WorkflowSubcommand,
    config: &Config,
    quiet: bool,
) -> CliResult<i32> {
    match subcommand {
        WorkflowSubcommand::Validate { file, format } => run_validate(&file, format),
        WorkflowSubcommand::Run {
            file,
            tree,
            team,
            fail_commands,
            format,
        } => {
            let options = RunOptions {
                tree,
                team,
                fail_commands,
                format,
                quiet,
            };
            run(&file, options, config).await
        }
    }
}

fn load_graph(file: &Path) -> anyhow::Result<BlockGraph> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read workflow file '{}'", file.display()))?;
    BlockGraph::from_json(&content)
        .with_context(|| format!("Invalid workflow file '{}'", file.display()))
}

/// Exit code for a validation report: 0 valid, 1 warnings only, 2 errors
pub fn report_exit_code(report: &ValidationReport) -> i32 {
    if !report.is_valid() {
        EXIT_ERROR
    } else if report.has_warnings() {
        EXIT_WARNING
    } else {
        EXIT_SUCCESS
    }
}

fn run_validate(file: &Path, format: OutputFormat) -> CliResult<i32> {
    let graph = load_graph(file)?;
    let report = validate(&graph);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).cli_general_error()?);
        }
        OutputFormat::Text => {
            for error in &report.errors {
                println!("{} {}", "ERROR".red().bold(), error);
            }
            for warning in &report.warnings {
                println!("{} {}", "WARN".yellow().bold(), warning);
            }
            if report.is_valid() {
                println!(
                    "{} {} ({} blocks, {} warnings)",
                    "Valid:".green().bold(),
                    file.display(),
                    graph.blocks.len(),
                    report.warnings.len()
                );
            } else {
                println!(
                    "{} {} ({} errors, {} warnings)",
                    "Invalid:".red().bold(),
                    file.display(),
                    report.errors.len(),
                    report.warnings.len()
                );
            }
        }
    }
    Ok(report_exit_code(&report))
}

struct RunOptions {
    tree: Option<String>,
    team: Option<String>,
    fail_commands: Vec<String>,
    format: OutputFormat,
    quiet: bool,
}

/// Prints one line per finished block
struct ProgressPrinter;

impl ExecutionObserver for ProgressPrinter {
    fn block_started(&self, path: &str, block: &Block) {
        tracing::debug!(block = %path, kind = %block.kind, "Block started");
    }

    fn block_finished(&self, path: &str, result: &BlockResult) {
        let marker = if result.success {
            "✓".green()
        } else {
            "✗".red()
        };
        let mut line = format!(
            "{} {} ({}) {}ms",
            marker, path, result.kind, result.duration_ms
        );
        if let Some(error) = &result.error {
            line.push_str(&format!(": {}", error));
        }
        println!("{}", line);
    }
}

struct Silent;

impl ExecutionObserver for Silent {
    fn block_started(&self, _path: &str, _block: &Block) {}
    fn block_finished(&self, _path: &str, _result: &BlockResult) {}
}

async fn run(file: &Path, options: RunOptions, config: &Config) -> CliResult<i32> {
    let graph = load_graph(file)?;

    let device = Arc::new(SimulatedDevice::new().failing_all(options.fail_commands));
    let mut executor = WorkflowExecutor::new(device.clone(), device.clone()).with_config(config);

    if let Some(tree) = options.tree {
        let team = options.team.unwrap_or_default();
        let cache = GraphCache::from_config(config)?;
        if !cache.is_cached(&tree, &team) {
            return Err(CliError::new(
                format!(
                    "No cached graph for tree '{}' (team '{}'). Run `navflow graph build` first.",
                    tree, team
                ),
                EXIT_WARNING,
            ));
        }
        let navigation = NavigationExecutor::new(PathFinder::new(cache), team, device.clone(), device)
            .with_final_wait(config.apply_final_wait);
        executor = executor.with_navigation(navigation, tree);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling workflow");
            on_interrupt.cancel();
        }
    });

    let observer: Arc<dyn ExecutionObserver> =
        if options.quiet || options.format == OutputFormat::Json {
            Arc::new(Silent)
        } else {
            Arc::new(ProgressPrinter)
        };
    let result = executor.execute_observed(&graph, observer, cancel).await?;

    match options.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result).cli_general_error()?);
        }
        OutputFormat::Text if !options.quiet => print_outcome(&result),
        OutputFormat::Text => {}
    }

    Ok(if result.success {
        EXIT_SUCCESS
    } else {
        EXIT_WARNING
    })
}

fn print_outcome(result: &WorkflowResult) {
    let terminal = result.terminal_block_id.as_deref().unwrap_or("-");
    match result.status {
        ExecutionStatus::Completed => println!(
            "{} reached '{}' after {} blocks in {}ms",
            "Workflow completed:".green().bold(),
            terminal,
            result.steps.len(),
            result.execution_time_ms
        ),
        ExecutionStatus::Cancelled => println!(
            "{} after {} blocks",
            "Workflow cancelled".yellow().bold(),
            result.steps.len()
        ),
        _ => println!(
            "{} {}",
            "Workflow failed:".red().bold(),
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
