//! Pre/postrender actions and provider resolution.
//!
//! Actions are named modules carried on the job; providers are pluggable
//! upload/download transports resolved by name. An unknown action module or
//! provider name is a hard error surfaced to the caller, never skipped.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use stagehand_core::types::{ActionSpec, Job};

/// Pipeline stage an action list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStage {
    Prerender,
    Postrender,
}

impl fmt::Display for ActionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStage::Prerender => write!(f, "prerender"),
            ActionStage::Postrender => write!(f, "postrender"),
        }
    }
}

/// All errors that can arise from action dispatch.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action module '{0}'")]
    UnknownAction(String),

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("action '{module}' cannot run in {stage} mode")]
    WrongStage { module: String, stage: ActionStage },

    #[error("action '{module}' requires a provider")]
    MissingProvider { module: String },

    #[error("action '{module}' is missing parameter '{param}'")]
    MissingParam { module: String, param: &'static str },

    #[error("action '{module}' has no input and the job has no output")]
    MissingInput { module: String },

    #[error("action '{module}' input '{input}' is relative but the job has no workpath")]
    RelativeInput { module: String, input: String },

    #[error("provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },
}

/// Boxed future alias so [`Provider`] stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pluggable storage backend, resolved by name.
pub trait Provider: Send + Sync {
    fn upload<'a>(
        &'a self,
        job: &'a Job,
        file: &'a Path,
        params: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<(), ActionError>>;

    fn download<'a>(
        &'a self,
        job: &'a Job,
        src: &'a str,
        dest: &'a Path,
        params: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<(), ActionError>>;
}

/// Name → provider table.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Resolving an unknown name is a hard error.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Provider>, ActionError> {
        self.providers
            .get(name)
            .ok_or_else(|| ActionError::UnknownProvider(name.to_string()))
    }
}

/// Runs a job's named action lists. Implemented outside the worker core for
/// anything beyond the built-in modules.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(
        &self,
        job: &Job,
        stage: ActionStage,
    ) -> impl Future<Output = Result<(), ActionError>> + Send;
}

/// Dispatcher for jobs that carry no actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl ActionDispatcher for NoopDispatcher {
    async fn dispatch(&self, _job: &Job, _stage: ActionStage) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Dispatcher backed by a provider registry, with the built-in `upload` and
/// `download` modules.
#[derive(Default, Clone)]
pub struct ProviderDispatcher {
    registry: ProviderRegistry,
}

impl ProviderDispatcher {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    fn specs<'a>(job: &'a Job, stage: ActionStage) -> &'a [ActionSpec] {
        match stage {
            ActionStage::Prerender => &job.actions.prerender,
            ActionStage::Postrender => &job.actions.postrender,
        }
    }

    fn provider_for(&self, spec: &ActionSpec) -> Result<&Arc<dyn Provider>, ActionError> {
        let name = spec
            .provider
            .as_deref()
            .ok_or_else(|| ActionError::MissingProvider {
                module: spec.module.clone(),
            })?;
        self.registry.resolve(name)
    }

    /// Input file for `upload`: explicit input, else the job output.
    /// Relative paths resolve against the job workpath.
    fn resolve_input(job: &Job, spec: &ActionSpec) -> Result<PathBuf, ActionError> {
        match &spec.input {
            Some(input) => {
                let path = PathBuf::from(input);
                if path.is_absolute() {
                    return Ok(path);
                }
                match &job.workpath {
                    Some(workpath) => Ok(workpath.join(path)),
                    None => Err(ActionError::RelativeInput {
                        module: spec.module.clone(),
                        input: input.clone(),
                    }),
                }
            }
            None => job.output.clone().ok_or_else(|| ActionError::MissingInput {
                module: spec.module.clone(),
            }),
        }
    }

    async fn run_upload(
        &self,
        job: &Job,
        spec: &ActionSpec,
        stage: ActionStage,
    ) -> Result<(), ActionError> {
        if stage != ActionStage::Postrender {
            return Err(ActionError::WrongStage {
                module: spec.module.clone(),
                stage,
            });
        }
        let provider = self.provider_for(spec)?;
        let input = Self::resolve_input(job, spec)?;
        tracing::info!(job = %job.uid, file = %input.display(), "starting upload action");
        provider.upload(job, &input, &spec.params).await
    }

    async fn run_download(
        &self,
        job: &Job,
        spec: &ActionSpec,
        stage: ActionStage,
    ) -> Result<(), ActionError> {
        if stage != ActionStage::Prerender {
            return Err(ActionError::WrongStage {
                module: spec.module.clone(),
                stage,
            });
        }
        let provider = self.provider_for(spec)?;
        let src = spec
            .params
            .get("src")
            .and_then(|v| v.as_str())
            .ok_or(ActionError::MissingParam {
                module: spec.module.clone(),
                param: "src",
            })?;
        let dest_rel = spec
            .params
            .get("dest")
            .and_then(|v| v.as_str())
            .ok_or(ActionError::MissingParam {
                module: spec.module.clone(),
                param: "dest",
            })?;
        let dest = match &job.workpath {
            Some(workpath) => workpath.join(dest_rel),
            None => {
                return Err(ActionError::RelativeInput {
                    module: spec.module.clone(),
                    input: dest_rel.to_string(),
                })
            }
        };
        tracing::info!(job = %job.uid, src, dest = %dest.display(), "starting download action");
        provider.download(job, src, &dest, &spec.params).await
    }
}

impl ActionDispatcher for ProviderDispatcher {
    async fn dispatch(&self, job: &Job, stage: ActionStage) -> Result<(), ActionError> {
        for spec in Self::specs(job, stage) {
            match spec.module.as_str() {
                "upload" => self.run_upload(job, spec, stage).await?,
                "download" => self.run_download(job, spec, stage).await?,
                other => return Err(ActionError::UnknownAction(other.to_string())),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
