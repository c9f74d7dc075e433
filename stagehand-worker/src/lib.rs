//! # stagehand-worker
//!
//! The worker loop: poll a remote queue for render jobs, drive each through
//! setup → asset sync → render → report, and never lose a finished job to a
//! transient reporting failure.
//!
//! Transport lives behind the [`QueueClient`] and
//! [`stagehand_sync::AssetFetcher`] seams; the render engine behind
//! [`RenderEngine`]. The hosting process owns signal handling and flips the
//! [`ShutdownToken`]; an in-flight job is never aborted, only the pickup of
//! the next one is suppressed.

pub mod actions;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod queue;
pub mod setup;
pub mod shutdown;
pub mod worker;

pub use actions::{ActionDispatcher, ActionError, ActionStage, NoopDispatcher, Provider,
    ProviderDispatcher, ProviderRegistry};
pub use engine::{EngineSettings, RenderEngine, RenderError, RenderFault, RenderHooks};
pub use error::WorkerError;
pub use pipeline::{JobPipeline, RenderPipeline};
pub use queue::{sanitize_tag_selector, QueueClient, QueueError};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownToken};
pub use worker::{Worker, WorkerSummary};
