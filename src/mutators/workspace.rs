use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The target was already gone; not an error.
    Missing,
}

/// Remove one workspace artifact, file or directory.
#[instrument]
pub fn remove_path(path: &Path) -> io::Result<RemoveOutcome> {
    if !path.exists() {
        debug!(path = %path.display(), "already absent");
        return Ok(RemoveOutcome::Missing);
    }

    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }

    info!(path = %path.display(), "removed");
    Ok(RemoveOutcome::Removed)
}
