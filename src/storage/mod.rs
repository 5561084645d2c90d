//! Storage layer for reviewledger.
//!
//! The [`KvStore`] trait defines the blob-slot contract the ledger relies on.
//! [`InMemoryKvStore`] is always available; the durable [`FileKvStore`] is
//! compiled with the `persistent` feature.

mod memory;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryKvStore;
pub use traits::{validate_key, KvStore, StorageError, MAX_KEY_LEN};

#[cfg(feature = "persistent")]
pub use persistent::{open_store, FileKvStore, PersistentConfig};
