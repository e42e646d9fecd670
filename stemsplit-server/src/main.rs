//! stemsplit-server - vocal/accompaniment splitting service
//!
//! Accepts an audio upload, runs the separation tool on it and serves the
//! resulting stems for download.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use stemsplit_common::config::{resolve_config_path, StemsplitConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stemsplit_server::services::staging::ensure_directory;
use stemsplit_server::{build_router, AppState};

/// Command-line arguments for stemsplit-server
///
/// Each flag overrides the matching TOML value.
#[derive(Parser, Debug)]
#[command(name = "stemsplit-server")]
#[command(about = "Split uploaded audio into vocals and accompaniment")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "STEMSPLIT_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "STEMSPLIT_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "STEMSPLIT_PORT")]
    port: Option<u16>,

    /// Folder holding uploads/, output/ and spleeter_models/
    #[arg(short, long, env = "STEMSPLIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Explicit path to the separation tool executable
    #[arg(long, env = "STEMSPLIT_TOOL_PATH")]
    tool_path: Option<PathBuf>,

    /// Separation timeout in seconds (0 = unbounded)
    #[arg(long, env = "STEMSPLIT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Prebuilt frontend bundle to serve at /
    #[arg(long, env = "STEMSPLIT_FRONTEND_DIR")]
    frontend_dir: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "STEMSPLIT_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut StemsplitConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(tool_path) = self.tool_path {
            config.separation.tool_path = Some(tool_path);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.separation.timeout_secs = timeout_secs;
        }
        if let Some(frontend_dir) = self.frontend_dir {
            config.frontend_dir = Some(frontend_dir);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging so the TOML log level can apply
    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = StemsplitConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut config);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting stemsplit-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!(
            "Config file {} does not exist, using defaults",
            path.display()
        ),
        None => info!("No config file found, using compiled defaults"),
    }
    info!("Data folder: {}", config.data_dir.display());

    for dir in [config.upload_dir(), config.output_dir()] {
        ensure_directory(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let state = AppState::new(&config);
    match state.invoker.resolve_tool() {
        Ok(tool) => info!("Separation tool: {}", tool.display()),
        // Not fatal: the tool may be installed after startup
        Err(e) => error!("{}", e),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("Failed to read listen address")?;
    info!("stemsplit-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
