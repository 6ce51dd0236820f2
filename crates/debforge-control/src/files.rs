//! Reading and writing the files under a package's `debian/` directory

use crate::error::{ControlError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a file if it exists
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    debug!(path = %path.display(), "loading");
    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| ControlError::io(path, e))
}

/// Read a file, failing with [`ControlError::MissingFile`] in strict mode
pub(crate) fn read_checked(path: &Path, kind: &'static str, strict: bool) -> Result<Option<String>> {
    match read_optional(path)? {
        Some(text) => Ok(Some(text)),
        None if strict => Err(ControlError::MissingFile {
            kind,
            path: path.to_path_buf(),
        }),
        None => Ok(None),
    }
}

/// Write a file, creating its parent directories
pub(crate) fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ControlError::io(parent, e))?;
    }
    debug!(path = %path.display(), bytes = contents.len(), "saving");
    fs::write(path, contents).map_err(|e| ControlError::io(path, e))
}
