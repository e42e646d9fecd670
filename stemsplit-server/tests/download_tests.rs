//! Integration tests for GET /download/*subpath
//!
//! Stems are placed directly in the output folder; no separation tool runs.

mod helpers;

use axum::http::StatusCode;
use helpers::{body_bytes, get_request, json_body, TestEnv};
use tower::util::ServiceExt;

const SECRET: &[u8] = b"top-secret-contents";

/// Output folder with one job's stems, plus a secret file beside it
fn setup() -> TestEnv {
    let env = TestEnv::new();
    let job_dir = env.output_dir().join("0b6f3c1e-5d7a-4c1e-9a55-3f7c2b9d8e10_song");
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(job_dir.join("vocals.wav"), b"RIFF-vocals").unwrap();
    std::fs::write(job_dir.join("accompaniment.wav"), b"RIFF-accompaniment").unwrap();
    std::fs::write(env.config.data_dir.join("secret.txt"), SECRET).unwrap();
    std::fs::write(env.temp_dir.path().join("secret.txt"), SECRET).unwrap();
    env
}

#[tokio::test]
async fn test_download_existing_stem() {
    let env = setup();

    let response = env
        .app()
        .oneshot(get_request(
            "/download/0b6f3c1e-5d7a-4c1e-9a55-3f7c2b9d8e10_song/vocals.wav",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "audio/wav");
    assert_eq!(headers["content-length"], "11");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"vocals.wav\""
    );
    assert_eq!(body_bytes(response).await, b"RIFF-vocals");
}

#[tokio::test]
async fn test_download_missing_file() {
    let env = setup();

    let response = env
        .app()
        .oneshot(get_request(
            "/download/0b6f3c1e-5d7a-4c1e-9a55-3f7c2b9d8e10_song/drums.wav",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn test_download_directory_is_not_found() {
    let env = setup();

    let response = env
        .app()
        .oneshot(get_request(
            "/download/0b6f3c1e-5d7a-4c1e-9a55-3f7c2b9d8e10_song",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_before_output_folder_exists() {
    let env = TestEnv::new();

    let response = env
        .app()
        .oneshot(get_request("/download/anything/vocals.wav"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_without_subpath() {
    let env = setup();

    for uri in ["/download", "/download/"] {
        let response = env.app().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);
    }
}

#[tokio::test]
async fn test_traversal_never_leaks_outside_output_root() {
    let env = setup();

    let attempts = [
        "/download/../secret.txt",
        "/download/../../secret.txt",
        "/download/../../etc/passwd",
        "/download/%2e%2e/secret.txt",
        "/download/%2e%2e/%2e%2e/secret.txt",
        "/download/..%2Fsecret.txt",
        "/download/..%2F..%2Fetc%2Fpasswd",
        "/download/%2Fetc%2Fpasswd",
        "/download/0b6f3c1e-5d7a-4c1e-9a55-3f7c2b9d8e10_song/../../secret.txt",
        "/download/0b6f3c1e-5d7a-4c1e-9a55-3f7c2b9d8e10_song/%2e%2e/%2e%2e/secret.txt",
    ];

    for uri in attempts {
        let response = env.app().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);

        let body = body_bytes(response).await;
        assert!(
            !body.windows(SECRET.len()).any(|w| w == SECRET),
            "uri {} leaked file contents",
            uri
        );
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_output_root_refused() {
    let env = setup();
    std::os::unix::fs::symlink(
        env.config.data_dir.join("secret.txt"),
        env.output_dir().join("escape.wav"),
    )
    .unwrap();

    let response = env
        .app()
        .oneshot(get_request("/download/escape.wav"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "File not found");
}
