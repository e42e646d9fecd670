//! Artifact resolver
//!
//! The tool writes `<output_root>/<job output name>/{vocals,accompaniment}.wav`.
//! A job only counts as successful when both stems are on disk.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::models::JobId;

pub const VOCALS_FILE: &str = "vocals.wav";
pub const ACCOMPANIMENT_FILE: &str = "accompaniment.wav";

/// URL prefix the download route is mounted at
pub const DOWNLOAD_PREFIX: &str = "/download";

/// Tool exited cleanly but did not produce the expected layout
#[derive(Debug, Error)]
#[error("Expected output missing for {job}: {}", .missing.join(", "))]
pub struct MissingOutput {
    pub job: String,
    /// Relative paths that were not found
    pub missing: Vec<String>,
}

/// Relative locations of one job's stems, `/`-separated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    pub vocals: String,
    pub accompaniment: String,
}

impl StemPaths {
    /// Expected paths for a job's output directory name
    pub fn for_output_name(output_name: &str) -> Self {
        Self {
            vocals: format!("{}/{}", output_name, VOCALS_FILE),
            accompaniment: format!("{}/{}", output_name, ACCOMPANIMENT_FILE),
        }
    }

    pub fn vocals_url(&self) -> String {
        format!("{}/{}", DOWNLOAD_PREFIX, self.vocals)
    }

    pub fn accompaniment_url(&self) -> String {
        format!("{}/{}", DOWNLOAD_PREFIX, self.accompaniment)
    }
}

/// Checks a job's stems under the output root
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    output_root: PathBuf,
}

impl ArtifactResolver {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Expected stem paths for `job_id`, present or not
    pub fn expected(&self, job_id: &JobId) -> StemPaths {
        StemPaths::for_output_name(job_id.output_name())
    }

    /// Expected stem paths, only if both files exist
    pub async fn resolve(&self, job_id: &JobId) -> Result<StemPaths, MissingOutput> {
        let paths = self.expected(job_id);

        let mut missing = Vec::new();
        for relative in [&paths.vocals, &paths.accompaniment] {
            if !is_file(&self.output_root.join(relative)).await {
                missing.push(relative.clone());
            }
        }

        if missing.is_empty() {
            Ok(paths)
        } else {
            Err(MissingOutput {
                job: job_id.to_string(),
                missing,
            })
        }
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
