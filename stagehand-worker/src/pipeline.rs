//! Job pipeline: everything between picking a job up and reporting it done.
//!
//! Order matters: setup, then template asset sync (a job must never render
//! against incomplete templates), then prerender actions, the render itself,
//! and postrender actions. Failures anywhere surface to the worker, which
//! owns state transitions and status pushes.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use stagehand_core::types::Job;
use stagehand_sync::{sync_template, AssetFetcher, SyncOptions};

use crate::actions::{ActionDispatcher, ActionStage};
use crate::engine::{EngineSettings, RenderEngine, RenderHooks};
use crate::error::WorkerError;
use crate::setup;

/// Processes one acquired job. The worker loop is generic over this seam so
/// its polling and reporting behavior can be tested without a real engine.
pub trait JobPipeline: Send + Sync {
    fn run(
        &self,
        job: &mut Job,
        hooks: &mut dyn RenderHooks,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;
}

/// The standard pipeline: setup → sync → actions → render → actions.
pub struct RenderPipeline<R, D, F> {
    engine: R,
    dispatcher: D,
    fetcher: Option<Arc<F>>,
    settings: EngineSettings,
    cache_root: PathBuf,
    sync_options: SyncOptions,
}

impl<R, D, F> RenderPipeline<R, D, F>
where
    R: RenderEngine,
    D: ActionDispatcher,
    F: AssetFetcher,
{
    pub fn new(engine: R, dispatcher: D, settings: EngineSettings, cache_root: PathBuf) -> Self {
        Self {
            engine,
            dispatcher,
            fetcher: None,
            settings,
            cache_root,
            sync_options: SyncOptions::default(),
        }
    }

    /// Enable template-bucket syncing with the given fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<F>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_sync_options(mut self, options: SyncOptions) -> Self {
        self.sync_options = options;
        self
    }
}

impl<R, D, F> JobPipeline for RenderPipeline<R, D, F>
where
    R: RenderEngine,
    D: ActionDispatcher,
    F: AssetFetcher,
{
    async fn run(&self, job: &mut Job, hooks: &mut dyn RenderHooks) -> Result<(), WorkerError> {
        setup::prepare(job, &self.settings)?;

        if let Some(bucket) = job.template.bucket.clone() {
            let Some(fetcher) = &self.fetcher else {
                return Err(WorkerError::Config(format!(
                    "job requests template bucket '{bucket}' but no asset fetcher is configured"
                )));
            };
            let report =
                sync_template(&self.cache_root, &bucket, fetcher, &self.sync_options).await?;
            tracing::info!(
                job = %job.uid,
                bucket = %bucket,
                fetched = report.fetched.len(),
                removed = report.removed.len(),
                "template assets in sync",
            );
        }

        self.dispatcher.dispatch(job, ActionStage::Prerender).await?;
        self.engine.render(job, &self.settings, hooks).await?;
        self.dispatcher.dispatch(job, ActionStage::Postrender).await?;
        Ok(())
    }
}
