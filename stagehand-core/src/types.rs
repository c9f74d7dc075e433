//! Domain types for render jobs.
//!
//! Wire types (everything the queue sends or receives) serialize as
//! camelCase JSON to match the queue API. All path fields use `PathBuf`;
//! never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed job identifier, assigned by the queue producer.
///
/// Opaque, globally unique, never reused. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
///
/// Advances only forward: `queued → started → {finished | error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Queued,
    Started,
    Finished,
    Error,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Started => write!(f, "started"),
            JobState::Finished => write!(f, "finished"),
            JobState::Error => write!(f, "error"),
        }
    }
}

/// Which subsystem produced an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    Setup,
    Sync,
    Render,
    Action,
    Queue,
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One entry in a job's append-only error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub message: String,
    pub at: DateTime<Utc>,
    pub origin: ErrorOrigin,
}

impl ErrorRecord {
    pub fn new(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            at: Utc::now(),
            origin,
        }
    }
}

/// Template descriptor: what the render engine operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Source locator for the project file itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ext: Option<String>,

    /// Derived during setup for still-image extensions.
    #[serde(default)]
    pub image_sequence: bool,

    /// Content-store bucket holding the template's assets, when the template
    /// is cached and hash-synced locally rather than fetched whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

/// A single pre/postrender action descriptor. Opaque to the worker core;
/// interpreted by the action dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    /// Action module name, e.g. `"upload"`.
    pub module: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Input file; relative paths resolve against the job workpath.
    /// Defaults to the job output when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(default)]
    pub params: serde_json::Value,
}

/// Named action lists, keyed by pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Actions {
    #[serde(default)]
    pub prerender: Vec<ActionSpec>,

    #[serde(default)]
    pub postrender: Vec<ActionSpec>,
}

/// A render job as handed out by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub uid: JobId,

    #[serde(default)]
    pub state: JobState,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub template: Template,

    #[serde(default)]
    pub actions: Actions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_at: Option<DateTime<Utc>>,

    /// Append-only; a new error never displaces a previously recorded one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,

    /// Scratch directory for this job. Assigned exactly once during setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workpath: Option<PathBuf>,

    /// Expected render output file. Assigned exactly once during setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resultname: Option<String>,
}

impl Job {
    /// A fresh queued job with the given uid; everything else defaulted.
    pub fn new(uid: impl Into<JobId>) -> Self {
        Self {
            uid: uid.into(),
            state: JobState::Queued,
            tags: Vec::new(),
            template: Template::default(),
            actions: Actions::default(),
            started_at: None,
            finished_at: None,
            error_at: None,
            errors: Vec::new(),
            workpath: None,
            output: None,
            resultname: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Status updates
// ---------------------------------------------------------------------------

/// Partial job state pushed to the queue: transitions, progress, and the
/// accumulated error list. The uid travels out-of-band (in the request path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub state: JobState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
}

impl StatusUpdate {
    /// Snapshot of a job's reportable state.
    pub fn from_job(job: &Job) -> Self {
        Self {
            state: job.state,
            progress: None,
            started_at: job.started_at,
            finished_at: job.finished_at,
            error_at: job.error_at,
            errors: job.errors.clone(),
        }
    }

    /// A lightweight mid-render progress report.
    pub fn progress(state: JobState, percent: f32) -> Self {
        Self {
            state,
            progress: Some(percent),
            started_at: None,
            finished_at: None,
            error_at: None,
            errors: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_display_and_from() {
        assert_eq!(JobId::from("j-01").to_string(), "j-01");
        assert_eq!(JobId::from(String::from("x")), JobId::from("x"));
    }

    #[test]
    fn job_deserializes_from_queue_json() {
        let raw = r#"{
            "uid": "abc123",
            "tags": ["urgent", "AE2023"],
            "template": {
                "src": "plainly://acme/intro/project.aep",
                "outputModule": "h264",
                "outputExt": "mp4",
                "bucket": "acme/intro"
            },
            "actions": {
                "postrender": [
                    {"module": "upload", "provider": "http", "params": {"url": "https://example.test/out"}}
                ]
            }
        }"#;
        let job: Job = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(job.uid.as_str(), "abc123");
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.template.output_ext.as_deref(), Some("mp4"));
        assert_eq!(job.template.bucket.as_deref(), Some("acme/intro"));
        assert_eq!(job.actions.postrender.len(), 1);
        assert!(job.errors.is_empty());
    }

    #[test]
    fn status_update_serializes_camel_case() {
        let mut job = Job::new("u1");
        job.state = JobState::Started;
        job.started_at = Some(Utc::now());
        let json = serde_json::to_string(&StatusUpdate::from_job(&job)).expect("serialize");
        assert!(json.contains("\"startedAt\""));
        assert!(json.contains("\"state\":\"started\""));
        assert!(!json.contains("finishedAt"), "unset fields are omitted");
    }

    #[test]
    fn progress_update_carries_only_state_and_percent() {
        let update = StatusUpdate::progress(JobState::Started, 42.5);
        assert_eq!(update.progress, Some(42.5));
        assert!(update.started_at.is_none());
        assert!(update.errors.is_empty());
    }
}
