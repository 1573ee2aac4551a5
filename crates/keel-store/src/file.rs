//! File-backed snapshot persister

use std::path::{Path, PathBuf};

use keel_core::errors::{Result, SnapshotError};
use keel_core::model::snapshot::Snapshot;
use keel_core::persist::Persister;

use crate::atomic::atomic_write;
use crate::encode::encode_snapshot;

/// Persists snapshots to a single file, atomically replacing the previous
/// version on every save
///
/// The write path is temp→rename within the target directory, so a crash
/// mid-save leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FilePersister {
    path: PathBuf,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persister for FilePersister {
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = encode_snapshot(snapshot).map_err(|e| SnapshotError::Persister {
            message: e.to_string(),
        })?;

        atomic_write(&self.path, &bytes).map_err(|e| SnapshotError::Persister {
            message: e.to_string(),
        })?;

        tracing::debug!(path = %self.path.display(), "Saved snapshot");
        Ok(())
    }
}
