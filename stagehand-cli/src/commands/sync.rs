//! `stagehand sync` — manually synchronize one template bucket.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use stagehand_sync::{
    cache, sync_template, AssetFetcher, DeletePolicy, FsFetcher, SyncOptions, SyncReport,
};

use crate::client::HttpFetcher;

/// Arguments for `stagehand sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Template bucket path, e.g. acme/intro
    pub bucket: String,

    /// Content store: an http(s) base URL or a local directory.
    #[arg(long)]
    pub store: String,

    /// Upper bound on concurrent fetches.
    #[arg(long, default_value_t = 8)]
    pub max_concurrent: usize,

    /// Keep local files that were deleted remotely.
    #[arg(long)]
    pub keep_deleted: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?;
        runtime.block_on(self.sync())
    }

    async fn sync(self) -> Result<()> {
        let cache_root = cache::cache_root().context("resolving template cache root")?;
        let options = SyncOptions {
            max_concurrent_fetches: self.max_concurrent,
            delete_policy: if self.keep_deleted {
                DeletePolicy::Keep
            } else {
                DeletePolicy::Remove
            },
        };

        let report = if self.store.starts_with("http://") || self.store.starts_with("https://") {
            let fetcher = Arc::new(HttpFetcher::new(self.store.clone()));
            run_sync(&cache_root, &self.bucket, fetcher, &options).await?
        } else {
            let fetcher = Arc::new(FsFetcher::new(self.store.clone()));
            run_sync(&cache_root, &self.bucket, fetcher, &options).await?
        };

        print_report(&self.bucket, &report);
        Ok(())
    }
}

async fn run_sync<F: AssetFetcher>(
    cache_root: &std::path::Path,
    bucket: &str,
    fetcher: Arc<F>,
    options: &SyncOptions,
) -> Result<SyncReport> {
    sync_template(cache_root, bucket, &fetcher, options)
        .await
        .with_context(|| format!("sync failed for '{bucket}'"))
}

#[derive(Tabled)]
struct ReportRow {
    path: String,
    action: String,
}

fn print_report(bucket: &str, report: &SyncReport) {
    if report.attempted() == 0 {
        println!("{} '{bucket}' — already in sync", "✓".green());
        return;
    }

    println!(
        "{} '{bucket}' synced ({} fetched, {} removed, {} kept)",
        "✓".green(),
        report.fetched.len(),
        report.removed.len(),
        report.kept.len(),
    );

    let rows: Vec<ReportRow> = report
        .fetched
        .iter()
        .map(|path| ReportRow {
            path: path.clone(),
            action: String::from("fetched"),
        })
        .chain(report.removed.iter().map(|path| ReportRow {
            path: path.clone(),
            action: String::from("removed"),
        }))
        .chain(report.kept.iter().map(|path| ReportRow {
            path: path.clone(),
            action: String::from("kept"),
        }))
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
