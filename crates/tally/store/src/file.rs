//! Snapshot file persistence.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StoreResult;
use crate::store::IdentityStore;

/// Location of the persisted store.
///
/// The file is owned exclusively by the store host: it is read once at boot
/// and written once before a planned shutdown.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted store.
    ///
    /// Returns `Ok(None)` when no snapshot exists yet (first boot).
    pub fn load(&self) -> StoreResult<Option<IdentityStore>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let store = IdentityStore::restore(&bytes)?;
        info!(
            path = %self.path.display(),
            entries = store.len(),
            "store restored from snapshot"
        );
        Ok(Some(store))
    }

    /// Write `store` to disk.
    ///
    /// The snapshot goes to a sibling temporary file first and is renamed
    /// over the target, so the previous snapshot stays intact if the write
    /// is interrupted.
    pub fn save(&self, store: &IdentityStore) -> StoreResult<()> {
        let bytes = store.snapshot()?;
        let staging = self.staging_path();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;

        info!(
            path = %self.path.display(),
            entries = store.len(),
            bytes = bytes.len(),
            "snapshot written"
        );
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use tally_types::Identity;

    #[test]
    fn test_missing_file_is_first_boot() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("state.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("state.json"));

        let mut store = IdentityStore::new();
        store.set(&Identity::anonymous(), 5);
        file.save(&store).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, store);
        assert!(!file.staging_path().exists());
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{\"format\":\"tally-store\"").unwrap();

        let err = SnapshotFile::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptState(_)));
    }
}
