//! Binding between a [`Ledger`] and one key of a [`KvStore`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{validate_key, KvStore, StorageError};

use super::Ledger;

/// Loads and saves a ledger as a single blob under a fixed key.
///
/// The store is passed in explicitly so tests can substitute an in-memory
/// or failing fake.
#[derive(Clone)]
pub struct LedgerRepository {
    store: Arc<dyn KvStore>,
    key: String,
}

impl std::fmt::Debug for LedgerRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerRepository").field("key", &self.key).finish_non_exhaustive()
    }
}

impl LedgerRepository {
    /// Create a repository over `store` using the key derived from `config`.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidKey` if the derived key is not a valid storage key.
    pub fn new(store: Arc<dyn KvStore>, config: &LedgerConfig) -> Result<Self, StorageError> {
        let key = config.storage_key();
        validate_key(&key)?;
        Ok(Self { store, key })
    }

    /// The storage key this repository owns.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored ledger.
    ///
    /// An absent key yields an empty ledger.
    ///
    /// # Errors
    /// - `LedgerError::Corrupt` if a blob is present but unusable
    /// - `LedgerError::Storage` if the read itself failed
    pub fn load(&self) -> LedgerResult<Ledger> {
        match self.store.get(&self.key) {
            Ok(Some(bytes)) => {
                let ledger = Ledger::from_bytes(&bytes)?;
                debug!(key = %self.key, records = ledger.len(), "loaded ledger");
                Ok(ledger)
            }
            Ok(None) => {
                debug!(key = %self.key, "no stored ledger, starting empty");
                Ok(Ledger::new())
            }
            Err(StorageError::Corrupted(reason)) => Err(LedgerError::corrupt(reason)),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the stored ledger, falling back to empty on any failure.
    ///
    /// Corruption and read failures are logged as separate warnings so they
    /// stay distinguishable from a fresh install.
    #[must_use]
    pub fn load_or_empty(&self) -> Ledger {
        match self.load() {
            Ok(ledger) => ledger,
            Err(LedgerError::Corrupt { reason }) => {
                warn!(key = %self.key, %reason, "stored ledger is corrupt, continuing with an empty ledger");
                Ledger::new()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read stored ledger, continuing with an empty ledger");
                Ledger::new()
            }
        }
    }

    /// Write the whole ledger, replacing the previous blob.
    ///
    /// On error the durable copy is unchanged. The caller's in-memory ledger
    /// is not rolled back.
    ///
    /// # Errors
    /// Returns the underlying storage error.
    pub fn save(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let bytes = ledger.to_bytes()?;
        self.store.set(&self.key, &bytes).inspect_err(|e| {
            warn!(key = %self.key, error = %e, "failed to save ledger");
        })?;
        debug!(key = %self.key, records = ledger.len(), bytes = bytes.len(), "saved ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ItemId, ReviewCandidate};
    use crate::storage::InMemoryKvStore;

    struct FailingStore {
        inner: InMemoryKvStore,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl KvStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Io("read refused".to_string()));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Io("write refused".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn repo_over(store: Arc<dyn KvStore>) -> LedgerRepository {
        LedgerRepository::new(store, &LedgerConfig::default()).unwrap()
    }

    #[test]
    fn fresh_store_loads_empty_then_round_trips() {
        let repo = repo_over(Arc::new(InMemoryKvStore::new()));
        let ledger = repo.load().unwrap();
        assert!(ledger.is_empty());

        let ledger = ledger
            .upsert(&ReviewCandidate::new(42, "X", "Great", 8u8))
            .unwrap();
        repo.save(&ledger).unwrap();

        let reloaded = repo.load().unwrap();
        assert_eq!(reloaded, ledger);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.find_by_id(&ItemId::Int(42)).unwrap().review_text, "Great");
    }

    #[test]
    fn corrupt_blob_is_distinct_from_absent() {
        let store = Arc::new(InMemoryKvStore::new());
        store.set("ratedMovies", b"[{\"id\": 1,").unwrap();
        let repo = repo_over(store);

        let err = repo.load().unwrap_err();
        assert!(err.is_corrupt());
        assert!(repo.load_or_empty().is_empty());
    }

    #[test]
    fn read_failure_is_storage_error() {
        let store = Arc::new(FailingStore {
            inner: InMemoryKvStore::new(),
            fail_reads: true,
            fail_writes: false,
        });
        let repo = repo_over(store);

        let err = repo.load().unwrap_err();
        assert!(err.is_storage());
        assert!(err.is_retryable());
        assert!(repo.load_or_empty().is_empty());
    }

    #[test]
    fn write_failure_keeps_previous_blob() {
        let inner = InMemoryKvStore::new();
        let first = crate::Ledger::new()
            .upsert(&ReviewCandidate::new(1, "A", "First", 5u8))
            .unwrap();
        inner.set("ratedMovies", &first.to_bytes().unwrap()).unwrap();

        let store = Arc::new(FailingStore {
            inner,
            fail_reads: false,
            fail_writes: true,
        });
        let repo = repo_over(store);

        let second = first
            .upsert(&ReviewCandidate::new(2, "B", "Second", 6u8))
            .unwrap();
        assert!(matches!(repo.save(&second), Err(StorageError::Io(_))));
        assert_eq!(repo.load().unwrap(), first);
    }

    #[test]
    fn namespaced_config_uses_separate_key() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let shared = repo_over(store.clone());
        let alice = LedgerRepository::new(store, &LedgerConfig::default().for_user("alice")).unwrap();

        assert_eq!(shared.key(), "ratedMovies");
        assert_eq!(alice.key(), "ratedMovies:alice");

        let ledger = Ledger::new()
            .upsert(&ReviewCandidate::new(5, "T", "Mine", 4u8))
            .unwrap();
        alice.save(&ledger).unwrap();
        assert!(shared.load().unwrap().is_empty());
        assert_eq!(alice.load().unwrap().len(), 1);
    }

    #[test]
    fn rejects_unusable_key() {
        let config = LedgerConfig::default().for_user("has space");
        let err = LedgerRepository::new(Arc::new(InMemoryKvStore::new()), &config).unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
