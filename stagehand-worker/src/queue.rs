//! Queue client seam.
//!
//! The worker only ever needs two operations; everything about transport,
//! auth, and retry-at-the-HTTP-layer belongs to the implementation.

use std::future::Future;

use thiserror::Error;

use stagehand_core::types::{Job, JobId, StatusUpdate};

/// Transport or API failure talking to the queue service.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(String),

    #[error("queue rejected request ({status}): {message}")]
    Api { status: u16, message: String },
}

/// The queue service, as seen by the worker.
///
/// `pickup_job` is assumed atomic with respect to other workers: a job is
/// handed to at most one caller. `update_job` is an idempotent partial
/// update keyed by uid.
pub trait QueueClient: Send + Sync {
    fn pickup_job(
        &self,
        tag_selector: Option<&str>,
    ) -> impl Future<Output = Result<Option<Job>, QueueError>> + Send;

    fn update_job(
        &self,
        uid: &JobId,
        update: &StatusUpdate,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;
}

/// Restrict a free-text tag selector to alphanumerics, commas, and spaces
/// before it is sent upstream.
pub fn sanitize_tag_selector(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ',' || *c == ' ')
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
