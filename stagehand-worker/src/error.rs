//! Error surface for the worker loop and its pipeline.

use std::path::PathBuf;

use thiserror::Error;

use stagehand_core::types::ErrorOrigin;

use crate::actions::ActionError;
use crate::engine::RenderError;
use crate::queue::QueueError;

/// All errors that can arise while executing jobs.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("sync error: {0}")]
    Sync(#[from] stagehand_sync::SyncError),

    #[error("action error: {0}")]
    Action(#[from] ActionError),

    #[error("state error: {0}")]
    State(#[from] stagehand_core::StateError),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkerError {
    /// Which subsystem to attribute an error record to.
    pub fn origin(&self) -> ErrorOrigin {
        match self {
            WorkerError::Queue(_) => ErrorOrigin::Queue,
            WorkerError::Render(_) => ErrorOrigin::Render,
            WorkerError::Sync(_) => ErrorOrigin::Sync,
            WorkerError::Action(_) => ErrorOrigin::Action,
            WorkerError::State(_)
            | WorkerError::Setup(_)
            | WorkerError::Config(_)
            | WorkerError::Io { .. } => ErrorOrigin::Setup,
        }
    }
}

/// Convenience constructor for [`WorkerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WorkerError {
    WorkerError::Io {
        path: path.into(),
        source,
    }
}
