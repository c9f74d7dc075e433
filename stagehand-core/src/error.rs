//! Error types for stagehand-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{JobId, JobState};

/// Violations of the job state machine.
#[derive(Debug, Error)]
pub enum StateError {
    /// A transition that is not on the forward path
    /// `queued → started → {finished | error}`.
    #[error("job {uid}: illegal state transition {from} → {to}")]
    InvalidTransition {
        uid: JobId,
        from: JobState,
        to: JobState,
    },
}

/// All errors that can arise while loading worker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An environment variable held a value the setting cannot accept.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
