//! Job setup: result naming, working directory, version-tag detection.
//!
//! Runs once per job, before any asset sync or render. `workpath` and
//! `output` are assigned here exactly once; a job that arrives with a
//! workpath already set is refused rather than silently recomputed.

use stagehand_core::types::Job;

use crate::engine::EngineSettings;
use crate::error::{io_err, WorkerError};

/// Extensions rendered as numbered still-image sequences.
const STILL_IMAGE_EXTS: &[&str] = &["jpeg", "jpg", "png"];

/// Validate the job and derive its filesystem locations.
pub fn prepare(job: &mut Job, settings: &EngineSettings) -> Result<(), WorkerError> {
    if job.uid.as_str().is_empty() {
        return Err(WorkerError::Setup(String::from("job has no uid")));
    }
    if job.workpath.is_some() {
        return Err(WorkerError::Setup(format!(
            "job {} already has a workpath; setup runs exactly once",
            job.uid
        )));
    }

    if let (Some(module), None) = (&job.template.output_module, &job.template.output_ext) {
        tracing::warn!(
            job = %job.uid,
            module = %module,
            "output module set without output_ext; falling back to a platform default extension",
        );
    }

    let resultname = match job.template.output_ext.as_deref() {
        Some(ext) if STILL_IMAGE_EXTS.contains(&ext) => {
            job.template.image_sequence = true;
            format!("result_[#####].{ext}")
        }
        Some(ext) => format!("result.{ext}"),
        None => {
            let ext = if cfg!(target_os = "macos") { "mov" } else { "avi" };
            format!("result.{ext}")
        }
    };

    let workpath = settings.workpath.join(job.uid.as_str());
    std::fs::create_dir_all(&workpath).map_err(|e| io_err(&workpath, e))?;
    tracing::info!(job = %job.uid, workpath = %workpath.display(), "working directory ready");

    if let Some(year) = job.ae_version_year() {
        match settings.binaries_by_year.get(&year) {
            Some(binary) => tracing::info!(
                job = %job.uid,
                year,
                binary = %binary.display(),
                "render binary selected from version tag",
            ),
            None => tracing::info!(
                job = %job.uid,
                year,
                "no binary registered for tagged version; keeping default",
            ),
        }
    }

    // A producer-supplied output location wins; otherwise derive it.
    if job.output.is_none() {
        job.output = Some(workpath.join(&resultname));
    }
    job.resultname = Some(resultname);
    job.workpath = Some(workpath);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
