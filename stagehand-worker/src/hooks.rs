//! Queue-backed render hooks.
//!
//! Progress reports become spawned, best-effort status pushes so a slow
//! queue never blocks a running render. Faults are accumulated here and
//! drained into the job's error list after the render returns; the job's
//! mutable fields are only ever touched from the worker's own task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stagehand_core::types::{JobId, JobState, StatusUpdate};

use crate::engine::{RenderFault, RenderHooks};
use crate::queue::QueueClient;

pub struct QueueHooks<Q> {
    client: Arc<Q>,
    faults: Vec<RenderFault>,
    push_failed: Arc<AtomicBool>,
}

impl<Q: QueueClient + 'static> QueueHooks<Q> {
    pub fn new(client: Arc<Q>) -> Self {
        Self {
            client,
            faults: Vec::new(),
            push_failed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether any best-effort progress push failed during the render.
    pub fn push_failed(&self) -> bool {
        self.push_failed.load(Ordering::SeqCst)
    }

    /// Take the accumulated faults, oldest first.
    pub fn drain_faults(&mut self) -> Vec<RenderFault> {
        std::mem::take(&mut self.faults)
    }
}

impl<Q: QueueClient + 'static> RenderHooks for QueueHooks<Q> {
    fn on_progress(&mut self, uid: &JobId, percent: f32) {
        let client = Arc::clone(&self.client);
        let uid = uid.clone();
        let failed = Arc::clone(&self.push_failed);
        let update = StatusUpdate::progress(JobState::Started, percent);
        tokio::spawn(async move {
            if let Err(err) = client.update_job(&uid, &update).await {
                tracing::warn!(job = %uid, error = %err, "progress push failed");
                failed.store(true, Ordering::SeqCst);
            }
        });
    }

    fn on_error(&mut self, uid: &JobId, fault: RenderFault) {
        tracing::warn!(job = %uid, error = %fault, "render engine reported a fault");
        self.faults.push(fault);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
