//! Prebuilt frontend bundle (production variant)
//!
//! Unmatched `GET`/`HEAD` requests are served from the configured bundle
//! directory, with `index.html` as the single-page-app fallback. Paths under
//! an API prefix never fall through to the bundle.

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::error::ApiError;
use crate::AppState;

/// First path segments owned by the API
pub const RESERVED_PREFIXES: [&str; 4] = ["upload", "download", "health", "api"];

/// True when the first segment of `path` is an API prefix
pub fn is_reserved(path: &str) -> bool {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    RESERVED_PREFIXES.contains(&first)
}

/// Router fallback: frontend bundle or 404
pub async fn frontend_fallback(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD);

    let Some(dir) = state.frontend_dir.as_deref().filter(|_| is_read && !is_reserved(&path))
    else {
        return ApiError::NotFound(path).into_response();
    };

    let bundle = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
    match bundle.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
