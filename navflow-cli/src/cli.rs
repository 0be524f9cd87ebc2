use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "navflow")]
#[command(version)]
#[command(about = "Cross-tree navigation pathfinding and workflow runner for device automation")]
#[command(long_about = "
navflow builds unified navigation graphs from trees of device screens,
previews shortest paths across nested trees and runs test-case workflows.

Example usage:
  navflow graph build --trees ./data --root main --team qa
  navflow graph path --root main --team qa --target \"Settings\"
  navflow workflow validate smoke.json
  navflow workflow run smoke.json --tree main --team qa
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory of the graph cache, overriding configuration
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, inspect and query unified navigation graphs
    Graph {
        #[command(subcommand)]
        subcommand: GraphSubcommand,
    },
    /// Inspect or clear the unified graph cache
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },
    /// Validate and run test-case workflows
    Workflow {
        #[command(subcommand)]
        subcommand: WorkflowSubcommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum GraphSubcommand {
    /// Load a tree hierarchy, build its unified graph and cache it
    Build {
        /// Directory holding trees/*.json
        #[arg(long, value_name = "DIR")]
        trees: PathBuf,
        /// Root tree id
        #[arg(long)]
        root: String,
        /// Team id
        #[arg(long)]
        team: String,
    },
    /// Show node, edge and tree counts of a cached graph
    Stats {
        /// Root tree id
        #[arg(long)]
        root: String,
        /// Team id
        #[arg(long)]
        team: String,
    },
    /// Preview the path to a target node without touching a device
    Path {
        /// Root tree id
        #[arg(long)]
        root: String,
        /// Team id
        #[arg(long)]
        team: String,
        /// Target node id or label
        #[arg(long)]
        target: String,
        /// Start node id or label (defaults to the entry point)
        #[arg(long)]
        from: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Show cache location, entry count and counters
    Stats,
    /// Remove one cached graph, or all of them
    Clear {
        /// Root tree id of the graph to remove
        #[arg(long, requires = "team")]
        root: Option<String>,
        /// Team id of the graph to remove
        #[arg(long, requires = "root")]
        team: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkflowSubcommand {
    /// Check a workflow file for structural errors and warnings
    #[command(long_about = "
Check a workflow file for structural errors and warnings.

Exit codes:
  0  valid
  1  valid with warnings
  2  invalid
")]
    Validate {
        /// Workflow JSON file
        file: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run a workflow against a simulated device
    Run {
        /// Workflow JSON file
        file: PathBuf,
        /// Root tree used by navigation blocks (its graph must be cached)
        #[arg(long, requires = "team")]
        tree: Option<String>,
        /// Team owning the tree
        #[arg(long)]
        team: Option<String>,
        /// Command or verification type that fails on the simulated device
        #[arg(long = "fail-command", value_name = "COMMAND")]
        fail_commands: Vec<String>,
        /// Output format of the final result
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }
}
