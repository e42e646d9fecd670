//! Separation job identity and lifecycle
//!
//! A job has no persisted record: it is named by its staged upload file and
//! the output directory the tool produces for it. `JobState` exists for the
//! lifetime of one request so each transition can be logged.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::services::sanitizer::sanitize_filename;

/// Job identifier: `<uuid>_<sanitized original name>`
///
/// Doubles as the staged file name. The output directory name is the same
/// string with its extension removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Derive a fresh identifier for an untrusted upload name
    pub fn from_upload(original_filename: &str) -> Self {
        Self(sanitize_filename(original_filename))
    }

    /// File name under the staging area
    pub fn staged_name(&self) -> &str {
        &self.0
    }

    /// Directory name the separation tool creates under the output root
    pub fn output_name(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => &self.0,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Input staged, tool not started
    Pending,
    /// Separation tool running
    Running,
    /// Both stems present
    Succeeded,
    /// Tool failed or produced incomplete output
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// One upload's separation job (in-memory only)
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub staged_path: PathBuf,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// New job for an already staged input file
    pub fn new(id: JobId, staged_path: PathBuf) -> Self {
        Self {
            id,
            staged_path,
            state: JobState::Pending,
            created_at: Utc::now(),
        }
    }

    /// Move to `new_state`; terminal states are final
    pub fn transition_to(&mut self, new_state: JobState) {
        if self.state.is_terminal() {
            debug!(
                job_id = %self.id,
                state = ?self.state,
                ignored = ?new_state,
                "Job already finished, ignoring transition"
            );
            return;
        }

        debug!(
            job_id = %self.id,
            from = ?self.state,
            to = ?new_state,
            elapsed_ms = self.elapsed_ms(),
            "Job state transition"
        );
        self.state = new_state;
    }

    /// Milliseconds since the job was created
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.created_at)
            .num_milliseconds()
            .max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_strips_extension() {
        let id = JobId::from_upload("My Song.mp3");
        assert!(id.staged_name().ends_with("_MySong.mp3"));
        assert!(id.output_name().ends_with("_MySong"));
        assert_eq!(format!("{}.mp3", id.output_name()), id.staged_name());
    }

    #[test]
    fn test_output_name_strips_only_last_extension() {
        let id = JobId::from_upload("live.2019.flac");
        assert!(id.output_name().ends_with("_live.2019"));
    }

    #[test]
    fn test_output_name_without_extension() {
        let id = JobId::from_upload("");
        assert_eq!(id.output_name(), id.staged_name());
    }

    #[test]
    fn test_same_upload_name_gives_distinct_ids() {
        let a = JobId::from_upload("track.wav");
        let b = JobId::from_upload("track.wav");
        assert_ne!(a, b);
        assert_ne!(a.output_name(), b.output_name());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut job = Job::new(JobId::from_upload("a.mp3"), PathBuf::from("uploads/a.mp3"));
        assert_eq!(job.state, JobState::Pending);

        job.transition_to(JobState::Running);
        assert_eq!(job.state, JobState::Running);

        job.transition_to(JobState::Failed);
        assert_eq!(job.state, JobState::Failed);

        // Terminal states do not move
        job.transition_to(JobState::Succeeded);
        assert_eq!(job.state, JobState::Failed);
    }
}
