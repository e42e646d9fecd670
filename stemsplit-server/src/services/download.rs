//! Download containment
//!
//! The subpath comes straight from the URL, so it is treated as hostile no
//! matter how download links are normally generated. A request resolves only
//! if the target is a regular file whose canonical path lies under the
//! canonical output root.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// Path tried to leave the output root
    #[error("Path escapes output root: {0}")]
    Rejected(String),

    /// Nothing servable at that path
    #[error("File not found: {0}")]
    NotFound(String),
}

/// A located, servable artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Canonical absolute path
    pub path: PathBuf,
    /// Last path component, used for Content-Disposition
    pub file_name: String,
    pub len: u64,
}

/// Serves files from beneath the output root only
#[derive(Debug, Clone)]
pub struct DownloadRoot {
    root: PathBuf,
}

impl DownloadRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `subpath` to a file under the root
    pub async fn locate(&self, subpath: &str) -> Result<Artifact, DownloadError> {
        let relative = relative_path(subpath)
            .ok_or_else(|| DownloadError::Rejected(subpath.to_string()))?;

        let not_found = || DownloadError::NotFound(subpath.to_string());

        let canonical_root = fs::canonicalize(&self.root).await.map_err(|_| not_found())?;
        let canonical = fs::canonicalize(canonical_root.join(&relative))
            .await
            .map_err(|_| not_found())?;

        // Symlinks inside the root may still point elsewhere
        if !canonical.starts_with(&canonical_root) {
            warn!(
                requested = subpath,
                resolved = %canonical.display(),
                "Download resolved outside output root"
            );
            return Err(DownloadError::Rejected(subpath.to_string()));
        }

        let meta = fs::metadata(&canonical).await.map_err(|_| not_found())?;
        if !meta.is_file() {
            return Err(not_found());
        }

        let file_name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(not_found)?;

        Ok(Artifact {
            path: canonical,
            file_name,
            len: meta.len(),
        })
    }
}

/// Accept only non-empty relative paths made of plain components
///
/// Rejects `..`, absolute paths and Windows drive prefixes outright rather
/// than trying to normalize them.
pub fn relative_path(subpath: &str) -> Option<PathBuf> {
    if subpath.is_empty() || subpath.contains('\0') {
        return None;
    }

    let path = Path::new(subpath);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Content type by extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` value forcing a download
///
/// Characters that would break the quoted-string are replaced.
pub fn attachment_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DownloadRoot) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("output");
        std::fs::create_dir_all(root.join("job_song")).unwrap();
        std::fs::write(root.join("job_song").join("vocals.wav"), b"vocals-bytes").unwrap();
        std::fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();
        (temp_dir, DownloadRoot::new(root))
    }

    #[test]
    fn test_relative_path_rejects_traversal() {
        assert!(relative_path("../secret.txt").is_none());
        assert!(relative_path("job/../../secret.txt").is_none());
        assert!(relative_path("/etc/passwd").is_none());
        assert!(relative_path("").is_none());
        assert!(relative_path(".").is_none());
        assert!(relative_path("a\0b").is_none());
    }

    #[test]
    fn test_relative_path_accepts_plain_paths() {
        assert_eq!(
            relative_path("job/vocals.wav"),
            Some(PathBuf::from("job").join("vocals.wav"))
        );
        assert_eq!(
            relative_path("./job/vocals.wav"),
            Some(PathBuf::from("job").join("vocals.wav"))
        );
    }

    #[tokio::test]
    async fn test_locate_existing_file() {
        let (_temp_dir, root) = setup();
        let artifact = root.locate("job_song/vocals.wav").await.unwrap();

        assert_eq!(artifact.file_name, "vocals.wav");
        assert_eq!(artifact.len, 12);
        assert!(artifact.path.is_absolute());
    }

    #[tokio::test]
    async fn test_locate_traversal_rejected() {
        let (_temp_dir, root) = setup();
        assert_eq!(
            root.locate("../secret.txt").await,
            Err(DownloadError::Rejected("../secret.txt".to_string()))
        );
    }

    #[tokio::test]
    async fn test_locate_missing_and_directory() {
        let (_temp_dir, root) = setup();
        assert!(matches!(
            root.locate("job_song/accompaniment.wav").await,
            Err(DownloadError::NotFound(_))
        ));
        assert!(matches!(
            root.locate("job_song").await,
            Err(DownloadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_locate_without_output_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = DownloadRoot::new(temp_dir.path().join("missing"));
        assert!(matches!(
            root.locate("a/vocals.wav").await,
            Err(DownloadError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_rejected() {
        let (temp_dir, root) = setup();
        std::os::unix::fs::symlink(
            temp_dir.path().join("secret.txt"),
            root.root().join("job_song").join("leak.wav"),
        )
        .unwrap();

        assert!(matches!(
            root.locate("job_song/leak.wav").await,
            Err(DownloadError::Rejected(_))
        ));
    }

    #[test]
    fn test_headers() {
        assert_eq!(content_type_for("vocals.wav"), "audio/wav");
        assert_eq!(content_type_for("VOCALS.WAV"), "audio/wav");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
        assert_eq!(
            attachment_disposition("vocals.wav"),
            "attachment; filename=\"vocals.wav\""
        );
        assert_eq!(
            attachment_disposition("a\"b\\c\u{e9}.wav"),
            "attachment; filename=\"a_b_c_.wav\""
        );
    }
}
