//! Upload and separate
//!
//! `POST /upload` with multipart field `file`. The request is held open until
//! the separation tool finishes; the response carries relative download URLs
//! for both stems.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{Job, JobId, JobState};
use crate::services::staging::validate_filename;
use crate::services::{SeparationError, StageError, ValidationError};
use crate::AppState;

/// Multipart field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// Successful upload response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub vocals_url: String,
    pub music_url: String,
}

/// Build upload routes
///
/// Replaces the framework's default body limit with `max_upload_bytes`.
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_and_split))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /upload
///
/// Checks, in order: a `file` part exists, its filename is non-empty, its
/// extension is allowed. Nothing is written before all three pass.
pub async fn upload_and_split(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "Upload is not a multipart request");
        ValidationError::MissingFile
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| {
            warn!(error = %e, status = %e.status(), "Unreadable multipart body");
            ValidationError::from(e)
        })?
    {
        // Parts without a filename are plain form values, not files
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        validate_filename(&file_name)?;

        let job_id = JobId::from_upload(&file_name);
        let staged_path = state
            .staging
            .persist(&job_id, field)
            .await
            .map_err(|e| match e {
                StageError::Io(err) => {
                    error!(job_id = %job_id, error = %err, "Error saving file");
                    ApiError::Persistence(err)
                }
                StageError::Body(reason) => {
                    warn!(job_id = %job_id, reason = %reason, "Upload stream interrupted");
                    reason.into()
                }
            })?;

        let response = run_job(&state, Job::new(job_id, staged_path)).await?;
        return Ok(Json(response));
    }

    Err(ValidationError::MissingFile.into())
}

/// Separate a staged upload and check its stems
async fn run_job(state: &AppState, mut job: Job) -> ApiResult<UploadResponse> {
    job.transition_to(JobState::Running);

    match state.invoker.invoke(&job.staged_path, &job.id).await {
        Ok(output) => {
            debug!(
                job_id = %job.id,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "Separation tool output"
            );
        }
        Err(err) => {
            job.transition_to(JobState::Failed);
            log_separation_failure(&job.id, &err);
            return Err(err.into());
        }
    }

    match state.artifacts.resolve(&job.id).await {
        Ok(paths) => {
            job.transition_to(JobState::Succeeded);
            info!(
                job_id = %job.id,
                elapsed_ms = job.elapsed_ms(),
                "Separation complete"
            );
            Ok(UploadResponse {
                vocals_url: paths.vocals_url(),
                music_url: paths.accompaniment_url(),
            })
        }
        Err(missing) => {
            job.transition_to(JobState::Failed);
            error!(
                job_id = %job.id,
                missing = ?missing.missing,
                "Separation tool did not produce the expected output files"
            );
            Err(missing.into())
        }
    }
}

fn log_separation_failure(job_id: &JobId, err: &SeparationError) {
    match err {
        SeparationError::ExternalTool {
            status,
            stdout,
            stderr,
        } => {
            error!(
                job_id = %job_id,
                status = %status,
                stdout = %stdout,
                stderr = %stderr,
                "Separation tool execution failed"
            );
        }
        other if other.is_unexpected() => {
            error!(job_id = %job_id, error = %other, "An unexpected error occurred");
        }
        other => {
            error!(job_id = %job_id, error = %other, "Separation failed");
        }
    }
}
