//! File-backed capture source.
//!
//! Reads a photo that a camera app (or the user) has already written to disk.
//! With an archive directory configured, the photo is first copied to
//! `IMG_<unix millis>.<ext>` inside it so the upload history keeps pointing at
//! a file this tool owns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{CaptureSource, CapturedImage};
use crate::error::{GradeError, GradeResult};

#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
    archive_dir: Option<PathBuf>,
    name: String,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file {}", path.display());
        Self {
            path,
            archive_dir: None,
            name,
        }
    }

    /// Copy each captured photo into `dir` before handing it on.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn archive(&self, dir: &Path, bytes: &[u8]) -> GradeResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            GradeError::io("create photo archive", e).with_path(dir.display().to_string())
        })?;

        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_ascii_lowercase();
        let target = dir.join(format!(
            "IMG_{}.{}",
            chrono::Utc::now().timestamp_millis(),
            ext
        ));

        tokio::fs::write(&target, bytes).await.map_err(|e| {
            GradeError::io("archive photo", e).with_path(target.display().to_string())
        })?;
        debug!(from = %self.path.display(), to = %target.display(), "archived photo");
        Ok(target)
    }
}

#[async_trait]
impl CaptureSource for FileCapture {
    fn name(&self) -> &str {
        &self.name
    }

    async fn capture(&self) -> GradeResult<CapturedImage> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            let reason = match e.kind() {
                std::io::ErrorKind::NotFound => "photo not found".to_string(),
                std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
                _ => e.to_string(),
            };
            GradeError::capture(&self.name, reason)
        })?;

        if bytes.is_empty() {
            return Err(GradeError::capture(&self.name, "photo file is empty"));
        }

        let path = match &self.archive_dir {
            Some(dir) => self.archive(dir, &bytes).await?,
            None => std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone()),
        };

        info!(path = %path.display(), bytes = bytes.len(), "photo captured");
        Ok(CapturedImage { bytes, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_capture_error() {
        let source = FileCapture::new("/definitely/not/here.jpg");
        let err = source.capture().await.unwrap_err();
        assert_eq!(err.category(), "capture");
        assert!(err.to_string().contains("photo not found"));
    }

    #[tokio::test]
    async fn empty_file_is_capture_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, b"").unwrap();

        let err = FileCapture::new(&path).capture().await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn reads_bytes_and_keeps_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let captured = FileCapture::new(&path).capture().await.unwrap();
        assert_eq!(captured.bytes, b"not really a jpeg");
        assert!(captured.path.is_absolute());
        assert!(captured.path.ends_with("card.jpg"));
    }

    #[tokio::test]
    async fn archive_copies_photo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.JPG");
        std::fs::write(&path, b"photo").unwrap();
        let archive = dir.path().join("photos");

        let captured = FileCapture::new(&path)
            .with_archive_dir(&archive)
            .capture()
            .await
            .unwrap();

        assert!(captured.path.starts_with(&archive));
        let file_name = captured.path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("IMG_") && file_name.ends_with(".jpg"));
        assert_eq!(std::fs::read(&captured.path).unwrap(), b"photo");
    }
}
