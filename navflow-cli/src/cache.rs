//! `navflow cache` commands

use crate::cli::CacheSubcommand;
use crate::error::CliResult;
use crate::exit_codes::EXIT_SUCCESS;
use navflow::{Config, GraphCache};

pub fn run_cache_command(subcommand: CacheSubcommand, config: &Config) -> CliResult<i32> {
    let cache = GraphCache::from_config(config)?;
    match subcommand {
        CacheSubcommand::Stats => {
            let stats = cache.stats()?;
            println!("Location:  {}", stats.location);
            println!("Entries:   {}", stats.entries);
            println!("TTL:       {}s", cache.ttl().as_secs());
        }
        CacheSubcommand::Clear {
            root: Some(root),
            team: Some(team),
        } => {
            if cache.invalidate(&root, &team)? {
                println!("Removed cached graph for '{}' (team '{}')", root, team);
            } else {
                println!("No cached graph for '{}' (team '{}')", root, team);
            }
        }
        CacheSubcommand::Clear { .. } => {
            let removed = cache.invalidate_all()?;
            println!("Removed {} cached graphs", removed);
        }
    }
    Ok(EXIT_SUCCESS)
}
