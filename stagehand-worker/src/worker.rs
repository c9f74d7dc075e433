//! The worker loop.
//!
//! Exactly one job is mid-flight per worker instance; scaling out means
//! running more workers against the same queue. Mutual exclusion is the
//! queue's job: `pickup_job` hands a job to at most one worker.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use stagehand_core::config::WorkerConfig;
use stagehand_core::types::{ErrorRecord, Job, StatusUpdate};

use crate::error::WorkerError;
use crate::hooks::QueueHooks;
use crate::pipeline::JobPipeline;
use crate::queue::{sanitize_tag_selector, QueueClient, QueueError};
use crate::shutdown::ShutdownToken;

/// Consecutive final-push failures before the stuck-worker signal escalates
/// to an error-level log.
const STUCK_PUSH_ATTEMPTS: u32 = 10;

/// Counts reported when the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub completed: usize,
    pub failed: usize,
    pub abandoned: usize,
}

enum JobOutcome {
    Completed,
    Failed,
    Abandoned,
}

pub struct Worker<Q, P> {
    client: Arc<Q>,
    pipeline: P,
    config: WorkerConfig,
    shutdown: ShutdownToken,
    empty_pulls: u64,
}

impl<Q, P> Worker<Q, P>
where
    Q: QueueClient + 'static,
    P: JobPipeline,
{
    pub fn new(
        client: Arc<Q>,
        pipeline: P,
        config: WorkerConfig,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            client,
            pipeline,
            config,
            shutdown,
            empty_pulls: 0,
        }
    }

    /// Poll → execute → report until the queue runs dry (empty-pull limit)
    /// or shutdown is requested. Returns `Err` only under `stop_on_error`.
    pub async fn run(&mut self) -> Result<WorkerSummary, WorkerError> {
        let mut summary = WorkerSummary::default();
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!("shutdown requested; worker stopping");
                break;
            }
            let Some(mut job) = self.next_job().await? else {
                break;
            };
            match self.execute(&mut job).await? {
                JobOutcome::Completed => summary.completed += 1,
                JobOutcome::Failed => summary.failed += 1,
                JobOutcome::Abandoned => summary.abandoned += 1,
            }
        }
        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            abandoned = summary.abandoned,
            "worker loop finished",
        );
        Ok(summary)
    }

    /// The polling contract: returns the next job, or `None` when the
    /// empty-pull limit is reached or shutdown is requested.
    async fn next_job(&mut self) -> Result<Option<Job>, WorkerError> {
        let selector = self
            .config
            .tag_selector
            .as_deref()
            .map(sanitize_tag_selector);
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(None);
            }
            match self.client.pickup_job(selector.as_deref()).await {
                Ok(Some(job)) if !job.uid.as_str().is_empty() => {
                    self.empty_pulls = 0;
                    tracing::info!(job = %job.uid, "picked up job");
                    return Ok(Some(job));
                }
                Ok(_) => {
                    // A job without a uid counts the same as an empty pull.
                    self.empty_pulls += 1;
                    if let Some(limit) = self.config.empty_pull_limit() {
                        if self.empty_pulls >= limit {
                            tracing::info!(
                                pulls = self.empty_pulls,
                                "reached empty-pull limit; stopping",
                            );
                            return Ok(None);
                        }
                    }
                }
                Err(err) => {
                    if self.config.stop_on_error {
                        return Err(err.into());
                    }
                    tracing::warn!(error = %err, "job pickup failed; continuing to poll");
                }
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.config.polling_interval) => {}
            }
        }
    }

    async fn execute(&self, job: &mut Job) -> Result<JobOutcome, WorkerError> {
        job.begin(Utc::now())?;
        if let Err(err) = self
            .client
            .update_job(&job.uid, &StatusUpdate::from_job(job))
            .await
        {
            // Our claim never landed; another worker may own this job now.
            tracing::warn!(job = %job.uid, error = %err, "failed to push started state; job abandoned");
            return Ok(JobOutcome::Abandoned);
        }

        let mut hooks = QueueHooks::new(Arc::clone(&self.client));
        let result = self.pipeline.run(job, &mut hooks).await;

        let progress_push_failed = hooks.push_failed();
        for fault in hooks.drain_faults() {
            job.record_error(ErrorRecord::new(
                stagehand_core::types::ErrorOrigin::Render,
                fault.to_string(),
            ));
        }

        match result {
            Ok(()) => {
                job.finish(Utc::now())?;
                self.push_final(job).await;
                tracing::info!(job = %job.uid, "job finished");
                if progress_push_failed && self.config.stop_on_error {
                    return Err(WorkerError::Queue(QueueError::Transport(String::from(
                        "progress push failed with stop-on-error set",
                    ))));
                }
                Ok(JobOutcome::Completed)
            }
            Err(err) => {
                job.record_error(ErrorRecord::new(err.origin(), err.to_string()));
                job.fail(Utc::now())?;
                // One best-effort push, never retried.
                if let Err(push_err) = self
                    .client
                    .update_job(&job.uid, &StatusUpdate::from_job(job))
                    .await
                {
                    tracing::warn!(job = %job.uid, error = %push_err, "failed to push error state");
                }
                if self.config.stop_on_error {
                    return Err(err);
                }
                tracing::warn!(job = %job.uid, error = %err, "job failed");
                Ok(JobOutcome::Failed)
            }
        }
    }

    /// Deliver the terminal status, retrying forever: a finished job's
    /// outcome must eventually reach the queue. Backoff doubles from the
    /// polling interval up to the configured ceiling.
    async fn push_final(&self, job: &Job) {
        let update = StatusUpdate::from_job(job);
        let mut delay = self.config.polling_interval;
        let mut attempt: u32 = 0;
        loop {
            match self.client.update_job(&job.uid, &update).await {
                Ok(()) => {
                    if attempt > 0 {
                        tracing::info!(
                            job = %job.uid,
                            attempts = attempt + 1,
                            "final status delivered after retries",
                        );
                    }
                    return;
                }
                Err(err) => {
                    attempt = attempt.saturating_add(1);
                    if attempt >= STUCK_PUSH_ATTEMPTS {
                        tracing::error!(
                            job = %job.uid,
                            attempt,
                            error = %err,
                            "final status push repeatedly failing; worker may be stuck",
                        );
                    } else {
                        tracing::warn!(
                            job = %job.uid,
                            attempt,
                            error = %err,
                            "final status push failed; retrying",
                        );
                    }
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.retry_max_delay);
                }
            }
        }
    }
}
