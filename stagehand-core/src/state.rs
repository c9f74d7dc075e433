//! Job state machine.
//!
//! States advance only forward along `queued → started → {finished | error}`;
//! terminal states have no exits. Each transition sets its timestamp exactly
//! once. The worker consults these methods before every status push.

use chrono::{DateTime, Utc};

use crate::error::StateError;
use crate::types::{ErrorRecord, Job, JobState};

impl JobState {
    /// Whether the job can never change state again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Error)
    }

    /// Whether `self → next` is a legal forward transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Started)
                | (JobState::Started, JobState::Finished)
                | (JobState::Started, JobState::Error)
        )
    }
}

impl Job {
    fn transition(&mut self, next: JobState) -> Result<(), StateError> {
        if !self.state.can_transition_to(next) {
            return Err(StateError::InvalidTransition {
                uid: self.uid.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Take ownership of a queued job: `queued → started`, stamping
    /// `started_at`.
    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        self.transition(JobState::Started)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Mark a successful render: `started → finished`, stamping
    /// `finished_at`.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        self.transition(JobState::Finished)?;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Mark a failed render: `started → error`, stamping `error_at`.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        self.transition(JobState::Error)?;
        self.error_at = Some(now);
        Ok(())
    }

    /// Append an error record. Never truncates or replaces prior entries.
    pub fn record_error(&mut self, record: ErrorRecord) {
        self.errors.push(record);
    }

    /// Extract a render-engine version year from the job's tags.
    ///
    /// The first tag matching `AE<digits>` wins; trailing characters after
    /// the digits are ignored (`AE2023beta` → 2023). No matching tag is not
    /// an error.
    pub fn ae_version_year(&self) -> Option<u32> {
        self.tags.iter().find_map(|tag| {
            let rest = tag.strip_prefix("AE")?;
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
