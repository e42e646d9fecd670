//! Artifact download
//!
//! `GET /download/*subpath` streams a file from the output root as an
//! attachment. Containment is checked by [`DownloadRoot::locate`] for every
//! request.
//!
//! [`DownloadRoot::locate`]: crate::services::DownloadRoot::locate

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::download::{attachment_disposition, content_type_for};
use crate::AppState;

/// Build download routes
pub fn download_routes() -> Router<AppState> {
    Router::new().route("/download/*subpath", get(download_file))
}

/// GET /download/*subpath
pub async fn download_file(
    State(state): State<AppState>,
    subpath: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(subpath) = subpath.map_err(|rejection| ApiError::NotFound(rejection.to_string()))?;
    info!(subpath = %subpath, "Download requested");

    let artifact = state.downloads.locate(&subpath).await.map_err(|e| {
        warn!(subpath = %subpath, error = %e, "Download refused");
        ApiError::from(e)
    })?;

    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(|e| ApiError::NotFound(format!("{}: {}", subpath, e)))?;

    let headers = [
        (header::CONTENT_TYPE, content_type_for(&artifact.file_name).to_string()),
        (header::CONTENT_LENGTH, artifact.len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            attachment_disposition(&artifact.file_name),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
