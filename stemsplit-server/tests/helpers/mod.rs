//! Shared helpers for stemsplit-server integration tests
//!
//! Each test gets its own data folder in a temp dir. The separation tool is
//! replaced by a POSIX shell script that mimics Spleeter's output layout.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use stemsplit_common::config::StemsplitConfig;
use stemsplit_server::{build_router, AppState};
use tempfile::TempDir;

pub const BOUNDARY: &str = "stemsplit-test-boundary";

/// Behaviour of the stand-in separation tool
#[derive(Debug, Clone, Copy)]
pub enum FakeTool {
    /// Writes both stems
    Success,
    /// Writes only vocals, exits 0
    MissingAccompaniment,
    /// Prints a traceback and exits 1
    Fails,
    /// Never finishes
    Hangs,
}

impl FakeTool {
    fn script(self) -> &'static str {
        match self {
            FakeTool::Success => {
                r#"[ "$1" = "separate" ] || { echo "unexpected subcommand: $1" >&2; exit 64; }
out="$5"
input="$6"
name=$(basename "$input")
stem="${name%.*}"
mkdir -p "$out/$stem"
printf 'vocals:%s' "$name" > "$out/$stem/vocals.wav"
printf 'music:%s' "$name" > "$out/$stem/accompaniment.wav""#
            }
            FakeTool::MissingAccompaniment => {
                r#"out="$5"
name=$(basename "$6")
stem="${name%.*}"
mkdir -p "$out/$stem"
printf 'vocals:%s' "$name" > "$out/$stem/vocals.wav""#
            }
            FakeTool::Fails => {
                r#"echo "Traceback (most recent call last): /opt/secret/venv/spleeter" >&2
exit 1"#
            }
            FakeTool::Hangs => "exec sleep 30",
        }
    }
}

/// Isolated data folder plus matching configuration
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config: StemsplitConfig,
}

impl TestEnv {
    /// Configuration pointing at a tool path that does not exist
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let mut config = StemsplitConfig::default();
        config.data_dir = temp_dir.path().join("data");
        config.separation.tool_path = Some(temp_dir.path().join("bin").join("spleeter"));
        config.separation.timeout_secs = 30;
        Self { temp_dir, config }
    }

    /// Environment with a working stand-in tool installed
    #[cfg(unix)]
    pub fn with_tool(tool: FakeTool) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let env = Self::new();
        let path = env.tool_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", tool.script())).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        env
    }

    pub fn tool_path(&self) -> PathBuf {
        self.config.separation.tool_path.clone().unwrap()
    }

    pub fn app(&self) -> Router {
        build_router(AppState::new(&self.config))
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.config.upload_dir()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.output_dir()
    }
}

/// Multipart POST /upload with a single part
pub fn upload_request(field: &str, filename: Option<&str>, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
            BOUNDARY, field
        )
        .as_bytes(),
    );
    if let Some(filename) = filename {
        body.extend_from_slice(format!("; filename=\"{}\"", filename).as_bytes());
    }
    body.extend_from_slice(b"\r\nContent-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Test helper: Create GET request
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Read full response body
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

/// Test helper: Extract JSON body from response
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Entry names directly inside `dir`, sorted (empty if it does not exist)
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
