//! Hosting of the identity store inside the daemon.
//!
//! Axum runs handlers on a multi-threaded runtime, so the store sits behind
//! a reader/writer lock: reads share it, `increment` and `set` hold it
//! exclusively. Snapshot and restore happen only before the listener binds
//! and after it has drained.

use crate::config::{CorruptStatePolicy, StoreConfig};
use crate::error::{ApiError, ApiResult, DaemonResult};
use tally_store::{IdentityStore, SnapshotFile, StoreError};
use tally_types::{Identity, StoreStatus};
use tokio::sync::RwLock;

enum StoreSlot {
    Ready(IdentityStore),
    /// Boot found an undecodable snapshot; counter calls are refused.
    Quarantined { reason: String },
}

/// Owner of the live counter store and its snapshot file.
pub struct CounterHost {
    slot: RwLock<StoreSlot>,
    snapshot: Option<SnapshotFile>,
}

impl CounterHost {
    /// Host an empty store with no persistence.
    pub fn in_memory() -> Self {
        Self::with_store(IdentityStore::new())
    }

    /// Host an already-built store with no persistence.
    pub fn with_store(store: IdentityStore) -> Self {
        Self {
            slot: RwLock::new(StoreSlot::Ready(store)),
            snapshot: None,
        }
    }

    /// Build the store for process start.
    ///
    /// A missing snapshot means first boot and yields an empty store. An
    /// undecodable one either quarantines the store or aborts startup,
    /// depending on `config.on_corrupt`; it never falls back to an empty
    /// store.
    pub fn boot(config: &StoreConfig) -> DaemonResult<Self> {
        if !config.persistence {
            tracing::info!("Persistence disabled, counters live in memory only");
            return Ok(Self::in_memory());
        }

        let file = SnapshotFile::new(&config.snapshot_path);
        let slot = match file.load() {
            Ok(Some(store)) => StoreSlot::Ready(store),
            Ok(None) => {
                tracing::info!(path = %file.path().display(), "No snapshot found, starting empty");
                StoreSlot::Ready(IdentityStore::new())
            }
            Err(StoreError::CorruptState(reason)) => match config.on_corrupt {
                CorruptStatePolicy::Abort => return Err(StoreError::CorruptState(reason).into()),
                CorruptStatePolicy::Quarantine => {
                    tracing::error!(
                        path = %file.path().display(),
                        %reason,
                        "Snapshot is corrupt, counter capabilities disabled until it is repaired"
                    );
                    StoreSlot::Quarantined { reason }
                }
            },
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            slot: RwLock::new(slot),
            snapshot: Some(file),
        })
    }

    pub async fn status(&self) -> StoreStatus {
        match &*self.slot.read().await {
            StoreSlot::Ready(_) => StoreStatus::Ready,
            StoreSlot::Quarantined { .. } => StoreStatus::Quarantined,
        }
    }

    pub async fn read(&self, caller: &Identity) -> ApiResult<u64> {
        match &*self.slot.read().await {
            StoreSlot::Ready(store) => Ok(store.read(caller)),
            StoreSlot::Quarantined { reason } => Err(quarantined(reason)),
        }
    }

    pub async fn increment(&self, caller: &Identity) -> ApiResult<u64> {
        match &mut *self.slot.write().await {
            StoreSlot::Ready(store) => Ok(store.increment(caller)?),
            StoreSlot::Quarantined { reason } => Err(quarantined(reason)),
        }
    }

    pub async fn set(&self, caller: &Identity, value: u64) -> ApiResult<u64> {
        match &mut *self.slot.write().await {
            StoreSlot::Ready(store) => Ok(store.set(caller, value)),
            StoreSlot::Quarantined { reason } => Err(quarantined(reason)),
        }
    }

    /// Number of materialized counters, `None` while quarantined.
    pub async fn entry_count(&self) -> Option<usize> {
        match &*self.slot.read().await {
            StoreSlot::Ready(store) => Some(store.len()),
            StoreSlot::Quarantined { .. } => None,
        }
    }

    /// Write the snapshot ahead of a planned shutdown.
    ///
    /// A quarantined store is left alone so the corrupt file stays available
    /// for inspection.
    pub async fn persist(&self) -> DaemonResult<()> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };

        match &*self.slot.read().await {
            StoreSlot::Ready(store) => {
                file.save(store)?;
                Ok(())
            }
            StoreSlot::Quarantined { .. } => {
                tracing::warn!(
                    path = %file.path().display(),
                    "Store quarantined, leaving snapshot file untouched"
                );
                Ok(())
            }
        }
    }
}

fn quarantined(reason: &str) -> ApiError {
    ApiError::StateUnavailable(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn persistent(path: &Path, on_corrupt: CorruptStatePolicy) -> StoreConfig {
        StoreConfig {
            persistence: true,
            snapshot_path: path.to_path_buf(),
            on_corrupt,
        }
    }

    #[tokio::test]
    async fn test_counters_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = persistent(&dir.path().join("state.json"), CorruptStatePolicy::Quarantine);
        let caller = Identity::self_authenticating(&[1u8; 32]);

        let host = CounterHost::boot(&config).unwrap();
        host.increment(&caller).await.unwrap();
        host.increment(&Identity::anonymous()).await.unwrap();
        host.set(&caller, 1u64 << 63).await.unwrap();
        host.persist().await.unwrap();
        drop(host);

        let host = CounterHost::boot(&config).unwrap();
        assert_eq!(host.read(&caller).await.unwrap(), 1u64 << 63);
        assert_eq!(host.read(&Identity::anonymous()).await.unwrap(), 1);
        assert_eq!(host.entry_count().await, Some(2));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_quarantines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{\"format\":").unwrap();

        let host = CounterHost::boot(&persistent(&path, CorruptStatePolicy::Quarantine)).unwrap();
        assert_eq!(host.status().await, StoreStatus::Quarantined);

        let caller = Identity::anonymous();
        assert!(matches!(
            host.read(&caller).await,
            Err(ApiError::StateUnavailable(_))
        ));
        assert!(matches!(
            host.increment(&caller).await,
            Err(ApiError::StateUnavailable(_))
        ));

        host.persist().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{\"format\":");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_aborts_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"garbage").unwrap();

        let result = CounterHost::boot(&persistent(&path, CorruptStatePolicy::Abort));
        assert!(matches!(
            result,
            Err(crate::error::DaemonError::Store(StoreError::CorruptState(_)))
        ));
    }

    #[tokio::test]
    async fn test_overflow_surfaces_as_api_error() {
        let host = CounterHost::in_memory();
        let caller = Identity::anonymous();
        host.set(&caller, u64::MAX).await.unwrap();
        assert!(matches!(
            host.increment(&caller).await,
            Err(ApiError::CounterOverflow(_))
        ));
        assert_eq!(host.read(&caller).await.unwrap(), u64::MAX);
    }
}
