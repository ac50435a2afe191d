//! Tag reader trait definition

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file's tags could not be read
#[derive(Debug, Error)]
#[error("failed to read tags from {path:?}: {reason}")]
pub struct TagReadError {
    pub path: PathBuf,
    pub reason: String,
}

impl TagReadError {
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Source of the free-text comment embedded in an audio file
pub trait TagReader {
    /// Read the comment field. A file without a comment yields an empty string.
    fn read_comment(&self, path: &Path) -> Result<String, TagReadError>;
}

/// In-memory reader keyed by path, for dry previews and tests
impl TagReader for HashMap<PathBuf, String> {
    fn read_comment(&self, path: &Path) -> Result<String, TagReadError> {
        self.get(path)
            .cloned()
            .ok_or_else(|| TagReadError::new(path, "no comment registered"))
    }
}
