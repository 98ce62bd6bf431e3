use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

/// A request-owned temporary file, removed when the guard is dropped.
///
/// Drop runs on every exit path of the owning pipeline, including early error
/// returns and a cancelled future. Removal errors are logged, never raised.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove temporary file"
            ),
        }
    }
}

/// Exclusive ownership of temporary paths across concurrent runs.
///
/// Temporary names are derived from the source path, so two runs over
/// `clip.mp4` and `clip.mov` (or the same file twice) want the same waveform.
/// Holding the path's guard makes the second run wait until the first has
/// removed its file.
#[derive(Debug, Default)]
pub struct PathLocks {
    held: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on are only referenced by the map.
            held.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(held.entry(path.to_path_buf()).or_default())
        };
        lock.lock_owned().await
    }
}
