//! `stagehand cache` — inspect the local template cache and build manifests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use stagehand_sync::{cache, manifest};

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Print the cache root directory.
    Path,

    /// Hash a directory tree and print its `hashes.json` manifest, for
    /// seeding a content store.
    Manifest { dir: PathBuf },
}

pub fn run(command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Path => {
            let root = cache::cache_root().context("resolving template cache root")?;
            println!("{}", root.display());
            Ok(())
        }
        CacheCommand::Manifest { dir } => {
            let manifest = manifest::build(&dir)
                .with_context(|| format!("hashing files under {}", dir.display()))?;
            let json =
                serde_json::to_string_pretty(&manifest).context("serializing manifest")?;
            println!("{json}");
            Ok(())
        }
    }
}
