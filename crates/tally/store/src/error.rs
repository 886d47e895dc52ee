//! Error types for tally-store.

use tally_types::Identity;
use thiserror::Error;

/// Errors raised by the counter store and its persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The counter is already at `u64::MAX`; the stored value is unchanged.
    #[error("counter overflow for {owner}")]
    CounterOverflow { owner: Identity },

    /// Snapshot bytes were truncated, tampered with or otherwise unusable.
    #[error("corrupt store state: {0}")]
    CorruptState(String),

    /// Encoding the store failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Reading or writing the snapshot file failed.
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
