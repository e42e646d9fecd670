//! Separation tool invoker
//!
//! Runs the external source-separation CLI (Spleeter) against a staged
//! upload:
//!
//! ```text
//! <tool> separate -p <preset> -o <output_root> <input_path>
//! ```
//!
//! # Requirements
//! - Tool installed next to the server binary, on `PATH`, or at an explicit
//!   configured path
//! - Write access to the output root and the model cache
//!
//! Arguments are passed as a discrete argv (no shell). The model cache
//! location is handed to the child through its own environment only; the
//! server's environment is never modified.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use stemsplit_common::config::StemsplitConfig;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::models::JobId;
use crate::services::staging::ensure_directory;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Tool invocation failures
#[derive(Debug, Error)]
pub enum SeparationError {
    /// No executable at any candidate location
    #[error("Separation tool not found (searched: {})", display_paths(.searched))]
    ToolNotFound { searched: Vec<PathBuf> },

    /// Tool ran and exited unsuccessfully
    #[error("Separation tool failed with {status}")]
    ExternalTool {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    /// Tool outlived the configured limit and was killed
    #[error("Separation tool timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    /// Output root or model cache could not be created
    #[error("Failed to prepare {}: {source}", .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Process could not be spawned or awaited
    #[error("Failed to run separation tool: {0}")]
    Launch(#[source] io::Error),
}

impl SeparationError {
    /// Failures outside the tool's own behaviour (spawn, filesystem)
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            SeparationError::Prepare { .. } | SeparationError::Launch(_)
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs the separation tool for staged uploads
#[derive(Debug, Clone)]
pub struct SeparationInvoker {
    tool_name: String,
    tool_path: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    preset: String,
    model_env_var: String,
    model_dir: PathBuf,
    output_root: PathBuf,
    timeout: Option<Duration>,
}

impl SeparationInvoker {
    /// Build from service configuration
    ///
    /// The install directory used for lookup is the directory of the
    /// running server binary.
    pub fn from_config(config: &StemsplitConfig) -> Self {
        let separation = &config.separation;
        Self {
            tool_name: separation.tool_name.clone(),
            tool_path: separation.tool_path.clone(),
            install_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            preset: separation.preset.clone(),
            model_env_var: separation.model_env_var.clone(),
            model_dir: config.model_dir(),
            output_root: config.output_dir(),
            timeout: (separation.timeout_secs > 0)
                .then(|| Duration::from_secs(separation.timeout_secs)),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Executable file name with the platform suffix (`.exe` on Windows)
    fn executable_name(&self) -> String {
        format!("{}{}", self.tool_name, std::env::consts::EXE_SUFFIX)
    }

    /// Candidate locations, in lookup order
    fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.tool_path {
            return vec![path.clone()];
        }

        let name = self.executable_name();
        let mut candidates = Vec::new();
        if let Some(dir) = &self.install_dir {
            candidates.push(dir.join(&name));
        }
        if let Some(path_var) = std::env::var_os("PATH") {
            candidates.extend(std::env::split_paths(&path_var).map(|dir| dir.join(&name)));
        }
        candidates
    }

    /// Locate the tool executable
    ///
    /// Fails with `ToolNotFound` instead of letting the spawn fail later with
    /// an opaque error.
    pub fn resolve_tool(&self) -> Result<PathBuf, SeparationError> {
        let candidates = self.candidates();
        match candidates.iter().find(|c| c.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(SeparationError::ToolNotFound {
                searched: candidates,
            }),
        }
    }

    /// Argument vector after the program name
    pub fn command_args(&self, input: &Path) -> Vec<OsString> {
        vec![
            "separate".into(),
            "-p".into(),
            self.preset.clone().into(),
            "-o".into(),
            self.output_root.clone().into_os_string(),
            input.as_os_str().to_os_string(),
        ]
    }

    /// Run the tool against `staged_path`
    ///
    /// Blocks the calling task until the tool exits or the timeout fires.
    /// Dropping the returned future kills the child.
    pub async fn invoke(
        &self,
        staged_path: &Path,
        job_id: &JobId,
    ) -> Result<ToolOutput, SeparationError> {
        let tool = self.resolve_tool()?;

        for dir in [&self.model_dir, &self.output_root] {
            ensure_directory(dir)
                .await
                .map_err(|source| SeparationError::Prepare {
                    path: dir.clone(),
                    source,
                })?;
        }

        let args = self.command_args(staged_path);
        info!(
            job_id = %job_id,
            command = %format_command(&tool, &args),
            "Running separation tool"
        );

        let mut command = Command::new(&tool);
        command
            .args(&args)
            .env(&self.model_env_var, &self.model_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| SeparationError::Timeout { after: limit })?,
            None => run.await,
        }
        .map_err(SeparationError::Launch)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(SeparationError::ExternalTool {
                status: output.status,
                stdout,
                stderr,
            });
        }

        info!(job_id = %job_id, "Separation tool finished");

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Human-readable command line, for logs only
fn format_command(tool: &Path, args: &[OsString]) -> String {
    std::iter::once(tool.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
impl SeparationInvoker {
    fn for_test(root: &Path, tool_path: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            tool_name: "spleeter".to_string(),
            tool_path: Some(tool_path),
            install_dir: None,
            preset: "spleeter:2stems".to_string(),
            model_env_var: "SPLEETER_MODEL_PATH".to_string(),
            model_dir: root.join("spleeter_models"),
            output_root: root.join("output"),
            timeout,
        }
    }
}
