// # Capture Module
//
// Sources that hand the workflow a freshly taken photo. The camera itself is
// outside this crate; a source only has to produce the encoded photo bytes and
// a stable path that the upload history can refer to.

pub mod file;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::GradeResult;

pub use file::FileCapture;

/// A photo as delivered by the camera, before any preprocessing.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Encoded photo bytes exactly as stored on disk (JPEG, PNG, ...).
    pub bytes: Vec<u8>,
    /// Where the photo lives; stored as the image reference of the upload.
    pub path: PathBuf,
}

/// Abstract interface for photo sources.
/// Replaces callback-style camera APIs with a single awaitable capture.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Human readable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Takes (or loads) one photo.
    ///
    /// Permission and hardware problems surface as capture errors.
    async fn capture(&self) -> GradeResult<CapturedImage>;
}
