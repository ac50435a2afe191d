//! Comment reader backed by lofty

use super::traits::{TagReadError, TagReader};
use lofty::prelude::*;
use std::path::Path;

/// Reads the comment from the primary tag, falling back to the first tag present
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read_comment(&self, path: &Path) -> Result<String, TagReadError> {
        let tagged_file =
            lofty::read_from_path(path).map_err(|e| TagReadError::new(path, e.to_string()))?;

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());

        let comment = tag
            .and_then(|t| t.comment())
            .map(|c| c.into_owned())
            .unwrap_or_default();

        log::debug!("Comment for {:?}: {:?}", path, comment);
        Ok(comment)
    }
}
