//! Property tests for the identity store.

use proptest::prelude::*;
use tally_store::{IdentityStore, StoreError};
use tally_types::Identity;

#[derive(Debug, Clone)]
enum Op {
    Read(usize),
    Increment(usize),
    Set(usize, u64),
}

fn identities() -> Vec<Identity> {
    let mut ids = vec![Identity::anonymous()];
    ids.extend((1u8..=4).map(|seed| Identity::self_authenticating(&[seed; 32])));
    ids
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..5).prop_map(Op::Read),
        (0usize..5).prop_map(Op::Increment),
        (0usize..5, any::<u64>()).prop_map(|(i, v)| Op::Set(i, v)),
    ]
}

proptest! {
    /// The store behaves like one independent counter per identity.
    #[test]
    fn matches_per_identity_model(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let ids = identities();
        let mut store = IdentityStore::new();
        let mut model = [0u64; 5];

        for op in ops {
            match op {
                Op::Read(i) => prop_assert_eq!(store.read(&ids[i]), model[i]),
                Op::Increment(i) => match model[i].checked_add(1) {
                    Some(next) => {
                        prop_assert_eq!(store.increment(&ids[i]).unwrap(), next);
                        model[i] = next;
                    }
                    None => {
                        let overflowed = matches!(
                            store.increment(&ids[i]),
                            Err(StoreError::CounterOverflow { .. })
                        );
                        prop_assert!(overflowed);
                    }
                },
                Op::Set(i, value) => {
                    prop_assert_eq!(store.set(&ids[i], value), value);
                    model[i] = value;
                }
            }
        }

        for (i, id) in ids.iter().enumerate() {
            prop_assert_eq!(store.read(id), model[i]);
        }
    }

    /// Reads never materialize entries and always agree with each other.
    #[test]
    fn reads_are_idempotent(seed in any::<u8>(), reads in 1usize..16) {
        let store = IdentityStore::new();
        let caller = Identity::self_authenticating(&[seed; 32]);
        for _ in 0..reads {
            prop_assert_eq!(store.read(&caller), 0);
        }
        prop_assert!(store.is_empty());
    }

    /// Snapshot then restore reproduces the mapping value for value.
    #[test]
    fn snapshot_restore_is_lossless(values in proptest::collection::vec(any::<u64>(), 0..5)) {
        let ids = identities();
        let mut store = IdentityStore::new();
        for (id, value) in ids.iter().zip(values) {
            store.set(id, value);
        }
        store.set(&ids[4], 1u64 << 63);

        let restored = IdentityStore::restore(&store.snapshot().unwrap()).unwrap();
        prop_assert_eq!(restored, store);
    }
}

#[test]
fn isolation_regardless_of_interleaving() {
    let a = Identity::self_authenticating(&[0xaa; 32]);
    let b = Identity::self_authenticating(&[0xbb; 32]);

    for order in [[&a, &a, &b], [&a, &b, &a], [&b, &a, &a]] {
        let mut store = IdentityStore::new();
        for caller in order {
            store.increment(caller).unwrap();
        }
        assert_eq!(store.read(&a), 2);
        assert_eq!(store.read(&b), 1);
    }
}

#[test]
fn durability_with_zero_and_large_values() {
    let mut store = IdentityStore::new();
    let zero = Identity::self_authenticating(&[1; 32]);
    let large = Identity::self_authenticating(&[2; 32]);
    store.set(&zero, 0);
    store.set(&large, 1u64 << 63);
    store.increment(&Identity::anonymous()).unwrap();

    let restored = IdentityStore::restore(&store.snapshot().unwrap()).unwrap();
    assert_eq!(restored.read(&zero), 0);
    assert_eq!(restored.read(&large), 1u64 << 63);
    assert_eq!(restored.read(&Identity::anonymous()), 1);
    assert_eq!(restored.len(), 3);
}
