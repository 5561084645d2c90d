//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of [`KvStore`].
//! It is intended for embedded usage, tests, and as a reference implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::storage::traits::{validate_key, KvStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory blob store.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    slots: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied keys.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self.slots.read().map_err(|_| lock_err("in-memory kv read"))?;
        Ok(guard.len())
    }

    /// Returns true if no key holds a value.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let guard = self.slots.read().map_err(|_| lock_err("in-memory kv read"))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut guard = self.slots.write().map_err(|_| lock_err("in-memory kv write"))?;
        guard.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut guard = self.slots.write().map_err(|_| lock_err("in-memory kv write"))?;
        guard.remove(key);
        Ok(())
    }
}
