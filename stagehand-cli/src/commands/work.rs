//! `stagehand work` — run the worker loop against a queue host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stagehand_core::config::WorkerConfig;
use stagehand_sync::cache;
use stagehand_worker::engine::EngineSettings;
use stagehand_worker::{
    shutdown_channel, ProviderDispatcher, ProviderRegistry, RenderPipeline, Worker,
};

use crate::client::{HttpFetcher, HttpQueueClient};
use crate::engine::CommandEngine;
use crate::providers::HttpProvider;

/// Arguments for `stagehand work`.
#[derive(Args, Debug)]
pub struct WorkArgs {
    /// Queue host, e.g. https://queue.example.com
    #[arg(long)]
    pub host: String,

    /// Shared secret sent with every queue request.
    #[arg(long)]
    pub secret: Option<String>,

    /// YAML config file (flags and environment override it).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tag selector for job pickup.
    #[arg(long)]
    pub tags: Option<String>,

    /// Poll interval in milliseconds.
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Stop after this many consecutive empty pulls (0 or less: poll forever).
    #[arg(long)]
    pub max_empty_pulls: Option<i64>,

    /// Fail fast instead of logging and continuing.
    #[arg(long)]
    pub stop_on_error: bool,

    /// Render binary used when no version tag matches.
    #[arg(long)]
    pub binary: Option<PathBuf>,

    /// Content store base URL for template buckets.
    #[arg(long)]
    pub store: Option<String>,
}

impl WorkArgs {
    pub fn run(self) -> Result<()> {
        let mut config =
            WorkerConfig::load(self.config.as_deref()).context("loading worker config")?;
        if let Some(ms) = self.poll_ms {
            config.polling_interval = Duration::from_millis(ms);
        }
        if let Some(max) = self.max_empty_pulls {
            config.max_empty_pulls = max;
        }
        if let Some(tags) = &self.tags {
            config.tag_selector = Some(tags.clone());
        }
        if self.stop_on_error {
            config.stop_on_error = true;
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?;
        runtime.block_on(run_worker(self, config))
    }
}

async fn run_worker(args: WorkArgs, config: WorkerConfig) -> Result<()> {
    let (handle, token) = shutdown_channel();
    tokio::spawn(async move {
        if wait_for_termination().await {
            tracing::info!("termination signal received; finishing the current job before stopping");
            handle.shutdown();
        }
    });

    let client = Arc::new(HttpQueueClient::new(args.host.clone(), args.secret.clone()));

    let mut settings = EngineSettings::new(config.workpath.clone());
    settings.default_binary = args.binary.clone();

    let mut registry = ProviderRegistry::new();
    registry.register("http", Arc::new(HttpProvider));

    let cache_root = cache::cache_root().context("resolving template cache root")?;
    let mut pipeline = RenderPipeline::<_, _, HttpFetcher>::new(
        CommandEngine,
        ProviderDispatcher::new(registry),
        settings,
        cache_root,
    );
    if let Some(store) = &args.store {
        pipeline = pipeline.with_fetcher(Arc::new(HttpFetcher::new(store.clone())));
    }

    let mut worker = Worker::new(client, pipeline, config, token);
    let summary = worker.run().await.context("worker loop failed")?;

    println!(
        "{} worker stopped ({} completed, {} failed, {} abandoned)",
        "✓".green(),
        summary.completed,
        summary.failed,
        summary.abandoned,
    );
    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            return tokio::signal::ctrl_c().await.is_ok();
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.is_ok(),
        _ = term.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> bool {
    tokio::signal::ctrl_c().await.is_ok()
}
