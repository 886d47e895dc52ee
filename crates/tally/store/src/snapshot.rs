//! Snapshot codec.
//!
//! A snapshot is a JSON envelope carrying a format tag, a version, the entry
//! count, the entries themselves and a BLAKE3 digest over a canonical binary
//! encoding of the entries. Decoding checks every one of those before a
//! single entry is handed back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tally_types::Identity;

use crate::error::{StoreError, StoreResult};

/// Format tag written into every snapshot.
pub const SNAPSHOT_FORMAT: &str = "tally-store";

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotEnvelope {
    format: String,
    version: u32,
    entry_count: u64,
    entries: Vec<SnapshotEntry>,
    digest: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotEntry {
    owner: Identity,
    value: u64,
}

impl SnapshotEnvelope {
    fn calculate_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.version.to_le_bytes());
        for entry in &self.entries {
            let owner = entry.owner.as_bytes();
            hasher.update(&(owner.len() as u32).to_le_bytes());
            hasher.update(owner);
            hasher.update(&entry.value.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    fn verify_integrity(&self) -> bool {
        self.digest == self.calculate_digest()
    }

    fn finalize(mut self) -> Self {
        self.digest = self.calculate_digest();
        self
    }
}

pub(crate) fn encode(entries: &BTreeMap<Identity, u64>) -> StoreResult<Vec<u8>> {
    let envelope = SnapshotEnvelope {
        format: SNAPSHOT_FORMAT.to_string(),
        version: SNAPSHOT_VERSION,
        entry_count: entries.len() as u64,
        entries: entries
            .iter()
            .map(|(owner, value)| SnapshotEntry {
                owner: owner.clone(),
                value: *value,
            })
            .collect(),
        digest: String::new(),
    }
    .finalize();

    serde_json::to_vec(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn decode(bytes: &[u8]) -> StoreResult<BTreeMap<Identity, u64>> {
    let envelope: SnapshotEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::CorruptState(format!("unreadable snapshot: {}", e)))?;

    if envelope.format != SNAPSHOT_FORMAT {
        return Err(StoreError::CorruptState(format!(
            "unexpected snapshot format {:?}",
            envelope.format
        )));
    }
    if envelope.version != SNAPSHOT_VERSION {
        return Err(StoreError::CorruptState(format!(
            "unsupported snapshot version {} (expected {})",
            envelope.version, SNAPSHOT_VERSION
        )));
    }
    if envelope.entry_count != envelope.entries.len() as u64 {
        return Err(StoreError::CorruptState(format!(
            "entry count mismatch: header says {}, found {}",
            envelope.entry_count,
            envelope.entries.len()
        )));
    }
    if !envelope.verify_integrity() {
        return Err(StoreError::CorruptState(
            "snapshot digest does not match its entries".to_string(),
        ));
    }

    let mut entries = BTreeMap::new();
    for entry in envelope.entries {
        if entries.insert(entry.owner.clone(), entry.value).is_some() {
            return Err(StoreError::CorruptState(format!(
                "duplicate entry for {}",
                entry.owner
            )));
        }
    }
    Ok(entries)
}
