//! # Upload History
//!
//! Append-only log of completed gradings. Records are created once, after a
//! successful grading round-trip, and are never updated; the only deletion is
//! a bulk clear.

pub mod sqlite;

use std::path::PathBuf;

pub use sqlite::ResultStore;

/// One completed grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    /// Assigned at insert; unique, monotonic and never reused.
    pub id: i64,
    /// Path of the captured photo.
    pub image_path: PathBuf,
    /// Verdict text exactly as returned by the grading service.
    pub verdict: String,
    /// RFC 3339 UTC timestamp of the insert.
    pub created_at: String,
}

/// Fields supplied by the caller when recording a grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub image_path: PathBuf,
    pub verdict: String,
}

impl NewUpload {
    pub fn new(image_path: impl Into<PathBuf>, verdict: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            verdict: verdict.into(),
        }
    }
}
