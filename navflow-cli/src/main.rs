use std::process;
mod cache;
mod cli;
mod error;
mod exit_codes;
mod graph;
mod workflow;

use clap::CommandFactory;
use cli::{Cli, Commands};
use error::handle_cli_result;
use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use navflow::Config;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse_args();

    let Some(command) = cli.command.take() else {
        let code = match Cli::command().print_help() {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_ERROR,
        };
        process::exit(code);
    };

    init_logging(&cli);
    if !Cli::should_use_color() {
        colored::control::set_override(false);
    }

    let mut config = Config::global().clone();
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    tracing::debug!(cache_dir = %config.cache_dir.display(), "Configuration loaded");

    let result = match command {
        Commands::Graph { subcommand } => {
            tracing::debug!("Running graph command");
            graph::run_graph_command(subcommand, &config).await
        }
        Commands::Cache { subcommand } => {
            tracing::debug!("Running cache command");
            cache::run_cache_command(subcommand, &config)
        }
        Commands::Workflow { subcommand } => {
            tracing::debug!("Running workflow command");
            workflow::run_workflow_command(subcommand, &config, cli.quiet).await
        }
    };

    process::exit(handle_cli_result(result));
}

/// Log to stderr at the level picked by the verbosity flags, unless `RUST_LOG` is set
fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
