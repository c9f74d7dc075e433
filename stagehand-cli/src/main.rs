//! Stagehand — render-farm worker CLI.
//!
//! # Usage
//!
//! ```text
//! stagehand work --host <url> [--secret <s>] [--tags <selector>] [--binary <path>]
//!                [--store <url|dir>] [--config <yaml>] [--poll-ms <n>]
//!                [--max-empty-pulls <n>] [--stop-on-error]
//! stagehand sync <bucket> --store <url|dir> [--max-concurrent <n>] [--keep-deleted]
//! stagehand cache path
//! ```

mod client;
mod commands;
mod engine;
mod logging;
mod providers;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{cache::CacheCommand, sync::SyncArgs, work::WorkArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stagehand",
    version,
    about = "Pull render jobs from a queue and keep template caches in sync",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the worker loop against a queue host.
    Work(WorkArgs),

    /// Synchronize one template bucket from a content store.
    Sync(SyncArgs),

    /// Inspect the local template cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Work(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Cache { command } => commands::cache::run(command),
    }
}
