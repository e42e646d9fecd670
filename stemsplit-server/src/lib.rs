//! stemsplit-server library
//!
//! Upload an audio file, split it into vocals and accompaniment with an
//! external separation tool, download the stems.

use axum::Router;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use stemsplit_common::config::StemsplitConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::services::{ArtifactResolver, DownloadRoot, SeparationInvoker, StagingArea};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Where uploads are written before processing
    pub staging: Arc<StagingArea>,
    /// Runs the separation tool
    pub invoker: Arc<SeparationInvoker>,
    /// Checks produced stems
    pub artifacts: Arc<ArtifactResolver>,
    /// Serves produced stems
    pub downloads: Arc<DownloadRoot>,
    /// Frontend bundle, only when configured and present on disk
    pub frontend_dir: Option<PathBuf>,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: &StemsplitConfig) -> Self {
        let output_root = config.output_dir();

        let frontend_dir = config.frontend_dir.clone().filter(|dir| {
            let present = dir.is_dir();
            if !present {
                warn!(
                    "Frontend directory {} not found, serving API only",
                    dir.display()
                );
            }
            present
        });

        Self {
            staging: Arc::new(StagingArea::new(config.upload_dir())),
            invoker: Arc::new(SeparationInvoker::from_config(config)),
            artifacts: Arc::new(ArtifactResolver::new(output_root.clone())),
            downloads: Arc::new(DownloadRoot::new(output_root)),
            frontend_dir,
            max_upload_bytes: config.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes(state.max_upload_bytes))
        .merge(api::download_routes())
        .merge(api::health_routes())
        .fallback(api::frontend_fallback)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
