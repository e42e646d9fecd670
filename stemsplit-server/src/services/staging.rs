//! Upload validation and staging area
//!
//! Validation runs before anything touches the filesystem. Staging streams
//! the request body straight to `<staging>/<job id>` without buffering the
//! whole file in memory.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use futures::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::models::JobId;

/// Accepted upload extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["mp3", "wav", "flac", "m4a"];

/// Client-side upload problems, each with its user-facing message
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file part in the request")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Invalid file type. Please upload an audio file.")]
    UnsupportedType(String),

    #[error("Malformed upload request")]
    Malformed(String),

    #[error("File exceeds the maximum upload size.")]
    TooLarge,
}

impl From<MultipartError> for ValidationError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ValidationError::TooLarge
        } else {
            ValidationError::Malformed(err.body_text())
        }
    }
}

/// Failure while writing an upload to the staging area
#[derive(Debug, Error)]
pub enum StageError {
    /// Filesystem problem on our side
    #[error("I/O error while staging upload: {0}")]
    Io(#[from] io::Error),

    /// The request body stream failed mid-transfer
    #[error("Upload stream interrupted: {0}")]
    Body(ValidationError),
}

/// True when `filename` has an extension in [`ALLOWED_EXTENSIONS`]
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Check a submitted filename in order: non-empty, then allowed extension
pub fn validate_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    if !allowed_file(filename) {
        return Err(ValidationError::UnsupportedType(filename.to_string()));
    }
    Ok(())
}

/// Directory holding staged uploads
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a job's input is staged at
    pub fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(job_id.staged_name())
    }

    /// Create the staging directory if absent
    pub async fn ensure_exists(&self) -> io::Result<()> {
        ensure_directory(&self.dir).await
    }

    /// Stream `body` into the staging area under `job_id`
    ///
    /// Never overwrites an existing file. A partially written file is removed
    /// when either the body or the disk fails.
    pub async fn persist<S, B, E>(&self, job_id: &JobId, body: S) -> Result<PathBuf, StageError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<ValidationError>,
    {
        self.ensure_exists().await?;

        let path = self.path_for(job_id);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let result = write_body(&mut file, body).await;
        drop(file);

        match result {
            Ok(bytes) => {
                info!(job_id = %job_id, path = %path.display(), bytes, "File saved successfully");
                Ok(path)
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&path).await {
                    warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "Could not remove partially staged upload"
                    );
                }
                Err(e)
            }
        }
    }
}

async fn write_body<S, B, E>(file: &mut fs::File, body: S) -> Result<u64, StageError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ValidationError>,
{
    let mut body = std::pin::pin!(body);
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| StageError::Body(e.into()))?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// `create_dir_all`, logging when the directory is new
pub async fn ensure_directory(dir: &Path) -> io::Result<()> {
    if fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(());
    }
    fs::create_dir_all(dir).await?;
    info!("Created directory: {}", dir.display());
    Ok(())
}
