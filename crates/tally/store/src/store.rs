//! The identity-keyed counter mapping.

use std::collections::BTreeMap;

use tally_types::Identity;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::snapshot;

/// Mapping from caller identity to counter value.
///
/// Entries are created on first write only; an identity with no entry reads
/// as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityStore {
    entries: BTreeMap<Identity, u64>,
}

impl IdentityStore {
    /// Create an empty store, as on first boot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `caller`, zero when no entry exists.
    pub fn read(&self, caller: &Identity) -> u64 {
        self.entries.get(caller).copied().unwrap_or(0)
    }

    /// Add one to `caller`'s counter and return the new value.
    ///
    /// Fails with [`StoreError::CounterOverflow`] at `u64::MAX`, leaving the
    /// stored value untouched.
    pub fn increment(&mut self, caller: &Identity) -> StoreResult<u64> {
        let current = self.read(caller);
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::CounterOverflow {
                owner: caller.clone(),
            })?;
        self.entries.insert(caller.clone(), next);
        debug!(owner = %caller, value = next, "counter incremented");
        Ok(next)
    }

    /// Overwrite (or create) `caller`'s counter.
    pub fn set(&mut self, caller: &Identity, value: u64) -> u64 {
        self.entries.insert(caller.clone(), value);
        debug!(owner = %caller, value, "counter set");
        value
    }

    /// Number of materialized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the full store.
    pub fn snapshot(&self) -> StoreResult<Vec<u8>> {
        snapshot::encode(&self.entries)
    }

    /// Rebuild a store from [`snapshot`](Self::snapshot) output.
    ///
    /// Any defect in the input fails with [`StoreError::CorruptState`]; a
    /// partially decoded store is never returned.
    pub fn restore(bytes: &[u8]) -> StoreResult<Self> {
        let entries = snapshot::decode(bytes)?;
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seed: u8) -> Identity {
        Identity::self_authenticating(&[seed; 32])
    }

    #[test]
    fn test_read_unknown_is_zero_without_entry() {
        let store = IdentityStore::new();
        assert_eq!(store.read(&id(1)), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_increment_materializes_entry() {
        let mut store = IdentityStore::new();
        assert_eq!(store.increment(&id(1)).unwrap(), 1);
        assert_eq!(store.increment(&id(1)).unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_isolation_between_identities() {
        let mut store = IdentityStore::new();
        let (a, b) = (id(1), id(2));
        store.increment(&a).unwrap();
        store.increment(&b).unwrap();
        store.increment(&a).unwrap();
        assert_eq!(store.read(&a), 2);
        assert_eq!(store.read(&b), 1);
    }

    #[test]
    fn test_set_then_increment() {
        let mut store = IdentityStore::new();
        let caller = id(3);
        assert_eq!(store.set(&caller, 42), 42);
        assert_eq!(store.read(&caller), 42);
        assert_eq!(store.increment(&caller).unwrap(), 43);
        assert_eq!(store.increment(&caller).unwrap(), 44);
    }

    #[test]
    fn test_set_zero_materializes_entry() {
        let mut store = IdentityStore::new();
        store.set(&id(4), 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(&id(4)), store.read(&id(5)));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut store = IdentityStore::new();
        let caller = id(6);
        store.set(&caller, u64::MAX);

        let err = store.increment(&caller).unwrap_err();
        assert!(matches!(err, StoreError::CounterOverflow { ref owner } if *owner == caller));
        assert_eq!(store.read(&caller), u64::MAX);

        store.set(&caller, 0);
        assert_eq!(store.increment(&caller).unwrap(), 1);
    }

    #[test]
    fn test_anonymous_is_an_ordinary_key() {
        let mut store = IdentityStore::new();
        let anon = Identity::anonymous();
        store.increment(&anon).unwrap();
        store.set(&id(7), 10);
        assert_eq!(store.read(&anon), 1);
        assert_eq!(store.read(&id(7)), 10);
    }
}
