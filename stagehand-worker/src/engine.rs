//! Render engine seam.
//!
//! The engine is an opaque long-running operation. It reports progress and
//! non-fatal faults through an explicit [`RenderHooks`] handler passed into
//! the call. Callbacks are synchronous with respect to the render, so the
//! job's mutable fields are never touched from two contexts at once.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;

use stagehand_core::types::{Job, JobId};

/// Fatal engine failure: the render did not produce its output.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A non-fatal fault reported by the engine mid-render.
///
/// Always one shape: a message string. Engines whose error values carry no
/// displayable payload use [`RenderFault::opaque`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFault {
    message: String,
}

impl RenderFault {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// For engine error values that cannot be rendered as text.
    pub fn opaque() -> Self {
        Self {
            message: String::from("render engine reported a non-displayable error"),
        }
    }
}

impl fmt::Display for RenderFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

/// Receiver for engine callbacks during one render.
pub trait RenderHooks: Send {
    /// Best-effort progress report, `percent` in `0.0..=100.0`.
    fn on_progress(&mut self, uid: &JobId, percent: f32);

    /// A fault that did not abort the render. Appended, never replacing
    /// earlier faults.
    fn on_error(&mut self, uid: &JobId, fault: RenderFault);
}

/// Host-side engine settings: scratch root and binary selection.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    /// Scratch root; each job works in `<workpath>/<uid>`.
    pub workpath: PathBuf,

    /// Binary used when no version tag matches.
    pub default_binary: Option<PathBuf>,

    /// Alternate binaries keyed by `AE<year>` tag year.
    pub binaries_by_year: HashMap<u32, PathBuf>,
}

impl EngineSettings {
    pub fn new(workpath: impl Into<PathBuf>) -> Self {
        Self {
            workpath: workpath.into(),
            default_binary: None,
            binaries_by_year: HashMap::new(),
        }
    }

    /// The binary for a tagged version year, falling back to the default.
    pub fn binary_for(&self, year: Option<u32>) -> Option<&Path> {
        year.and_then(|y| self.binaries_by_year.get(&y))
            .or(self.default_binary.as_ref())
            .map(PathBuf::as_path)
    }
}

/// The render engine, as seen by the worker.
pub trait RenderEngine: Send + Sync {
    fn render(
        &self,
        job: &Job,
        settings: &EngineSettings,
        hooks: &mut dyn RenderHooks,
    ) -> impl Future<Output = Result<(), RenderError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
