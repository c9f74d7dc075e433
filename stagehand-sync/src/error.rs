//! Error types for stagehand-sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::FetchFailure;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest JSON serialization/deserialization error.
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote manifest could not be fetched. Nothing was transferred.
    #[error("failed to fetch remote manifest for {bucket}: {source}")]
    RemoteManifest {
        bucket: String,
        #[source]
        source: crate::engine::FetchError,
    },

    /// Some file transfers failed. Successful transfers are kept on disk but
    /// the remote manifest is NOT accepted, so the next sync retries them.
    #[error("sync incomplete: {} of {attempted} transfers failed", failed.len())]
    Incomplete {
        attempted: usize,
        failed: Vec<FetchFailure>,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate the cache root.
    #[error("cannot determine home directory; set $HOME or STAGEHAND_CACHE_DIR")]
    HomeNotFound,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
