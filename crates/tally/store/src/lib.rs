//! # Tally Store - identity-partitioned counters
//!
//! This crate owns the mapping from caller [`Identity`] to counter value and
//! its persisted form.
//!
//! ## Overview
//!
//! - [`IdentityStore`]: the in-memory mapping and its four operations
//!   (`read`, `increment`, `set`, `snapshot`/`restore`)
//! - [`SnapshotFile`]: loads the store at boot and writes it back before a
//!   planned shutdown
//!
//! ## Concurrency
//!
//! The store is plain owned data: reads take `&self`, mutations take
//! `&mut self`. Hosts that serve requests in parallel wrap it in a
//! reader/writer lock so that no read overlaps a mutation.
//!
//! ## Example
//!
//! ```rust
//! use tally_store::IdentityStore;
//! use tally_types::Identity;
//!
//! let mut store = IdentityStore::new();
//! let caller = Identity::anonymous();
//! assert_eq!(store.read(&caller), 0);
//! assert_eq!(store.increment(&caller).unwrap(), 1);
//!
//! let bytes = store.snapshot().unwrap();
//! let restored = IdentityStore::restore(&bytes).unwrap();
//! assert_eq!(restored.read(&caller), 1);
//! ```
//!
//! [`Identity`]: tally_types::Identity

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
mod file;
mod snapshot;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::SnapshotFile;
pub use snapshot::{SNAPSHOT_FORMAT, SNAPSHOT_VERSION};
pub use store::IdentityStore;
