//! Local-disk storage for uploads and generated artifacts.
//!
//! Every request gets its own server-side names derived from a request id;
//! client-supplied file names never reach the filesystem.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::extraction::DocumentFormat;

/// File names of the two artifacts produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub pdf: String,
    pub cloud: String,
}

impl ArtifactNames {
    pub fn for_request(request_id: Uuid) -> Self {
        Self {
            pdf: format!("improved_resume-{request_id}.pdf"),
            cloud: format!("skill_cloud-{request_id}.png"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    static_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_dir: PathBuf, static_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            static_dir,
        }
    }

    /// Uploaded originals and generated PDFs; the only directory downloads read from.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Skill-cloud images.
    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.static_dir)
    }

    /// Stores an upload as `<request_id>.<ext>` and returns its path.
    pub async fn save_upload(
        &self,
        request_id: Uuid,
        format: DocumentFormat,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = self
            .upload_dir
            .join(format!("{request_id}.{}", format.extension()));
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved upload {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Maps a download name to an existing file in the upload directory.
    /// Anything that is not a plain file name resolves to `None`.
    pub async fn resolve_download(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_filename(name) {
            debug!("Rejected download name {name:?}");
            return None;
        }
        let path = self.upload_dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}

/// A single path component of ASCII alphanumerics, `-`, `_` and `.`, not starting with `.`.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Writes `bytes` to `dir/name` through a temporary file in the same directory,
/// so readers never observe a partially written artifact.
pub fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let target = dir.join(name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> ArtifactStore {
        let store = ArtifactStore::new(root.join("resumes"), root.join("static/resumes"));
        store.ensure_dirs().unwrap();
        store
    }

    #[test]
    fn test_artifact_names_are_request_scoped() {
        let a = ArtifactNames::for_request(Uuid::new_v4());
        let b = ArtifactNames::for_request(Uuid::new_v4());
        assert_ne!(a.pdf, b.pdf);
        assert_ne!(a.cloud, b.cloud);
        assert!(a.pdf.starts_with("improved_resume-") && a.pdf.ends_with(".pdf"));
        assert!(a.cloud.starts_with("skill_cloud-") && a.cloud.ends_with(".png"));
        assert!(is_safe_filename(&a.pdf) && is_safe_filename(&a.cloud));
    }

    #[test]
    fn test_safe_filename_rules() {
        assert!(is_safe_filename("improved_resume.pdf"));
        assert!(is_safe_filename("a-b_c.1.png"));
        for bad in ["", "..", ".env", "../secret", "a/b.pdf", "a\\b.pdf", "/etc/passwd", "x y.pdf", "ü.pdf"] {
            assert!(!is_safe_filename(bad), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_save_upload_uses_server_side_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let id = Uuid::new_v4();
        let path = store.save_upload(id, DocumentFormat::Docx, b"bytes").await.unwrap();
        assert_eq!(path, store.upload_dir().join(format!("{id}.docx")));
        assert_eq!(std::fs::read(path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_resolve_download_finds_only_files_in_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        write_atomic(store.upload_dir(), "improved_resume.pdf", b"%PDF").unwrap();
        std::fs::write(dir.path().join("outside.pdf"), b"secret").unwrap();

        assert_eq!(
            store.resolve_download("improved_resume.pdf").await,
            Some(store.upload_dir().join("improved_resume.pdf"))
        );
        assert_eq!(store.resolve_download("missing.pdf").await, None);
        assert_eq!(store.resolve_download("../outside.pdf").await, None);
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        write_atomic(dir.path(), "out.bin", b"first").unwrap();
        let path = write_atomic(dir.path(), "out.bin", b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary files must not be left behind");
    }
}
