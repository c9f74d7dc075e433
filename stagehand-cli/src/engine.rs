//! Render engine adapter: spawns the configured render binary.
//!
//! The binary's contract is minimal: it is invoked in the job workpath with
//! `-project`/`-comp`/`-output` arguments, prints `PROGRESS: <percent>` and
//! `ERROR: <message>` lines on stdout, and signals failure via its exit
//! status.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};

use stagehand_core::types::Job;
use stagehand_worker::engine::{EngineSettings, RenderEngine, RenderError, RenderFault, RenderHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEngine;

fn parse_progress(line: &str) -> Option<f32> {
    line.strip_prefix("PROGRESS:")
        .and_then(|rest| rest.trim().parse::<f32>().ok())
        .filter(|percent| (0.0..=100.0).contains(percent))
}

impl RenderEngine for CommandEngine {
    async fn render(
        &self,
        job: &Job,
        settings: &EngineSettings,
        hooks: &mut dyn RenderHooks,
    ) -> Result<(), RenderError> {
        let binary = settings
            .binary_for(job.ae_version_year())
            .ok_or_else(|| RenderError::new("no render binary configured"))?;
        let workpath = job
            .workpath
            .as_ref()
            .ok_or_else(|| RenderError::new("job has no workpath"))?;
        let output = job
            .output
            .as_ref()
            .ok_or_else(|| RenderError::new("job has no output path"))?;

        let mut command = tokio::process::Command::new(binary);
        command
            .current_dir(workpath)
            .arg("-output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(src) = &job.template.src {
            command.arg("-project").arg(src);
        }
        if let Some(comp) = &job.template.composition {
            command.arg("-comp").arg(comp);
        }

        tracing::info!(job = %job.uid, binary = %binary.display(), "starting render");
        let mut child = command
            .spawn()
            .map_err(|e| RenderError::new(format!("failed to spawn {}: {e}", binary.display())))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::new("render process has no stdout"))?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| RenderError::new(format!("reading render output: {e}")))?
        {
            if let Some(percent) = parse_progress(&line) {
                hooks.on_progress(&job.uid, percent);
            } else if let Some(message) = line.strip_prefix("ERROR:") {
                hooks.on_error(&job.uid, RenderFault::message(message.trim()));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RenderError::new(format!("waiting for render process: {e}")))?;
        if !status.success() {
            return Err(RenderError::new(format!(
                "render binary exited with {status}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
