//! Persistent storage backend for reviewledger.
//!
//! This module provides a durable, crash-safe blob store with:
//! - One file per key, named by the blake3 hash of the key
//! - Write-to-temp then rename, so a failed write keeps the old value
//! - File locking for single-process access to the directory
//! - CRC32 checksums for corruption detection
//!
//! # Layout
//!
//! ```text
//! <dir>/
//! ├── .reviewledger.lock          exclusive flock / LockFileEx
//! ├── <blake3(key)>.blob          [MAGIC][version][frame]
//! └── <blake3(key)>.blob.tmp      only while a write is in flight
//! ```

mod blob;
mod codec;
mod file_lock;

pub use blob::FileKvStore;
pub use file_lock::FileLock;

use std::path::Path;

use crate::storage::StorageError;

/// Configuration for persistent storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentConfig {
    /// Whether to fsync the blob and its directory after every write.
    pub sync_on_write: bool,
    /// Maximum size of a single stored value (bytes).
    pub max_blob_size: u64,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            max_blob_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl PersistentConfig {
    const MIN_BLOB_SIZE: u64 = 1024; // 1 KiB minimum so a handful of reviews always fit
    const MAX_BLOB_SIZE: u64 = codec::MAX_FRAME_SIZE as u64;

    /// Check the configured limits.
    ///
    /// # Errors
    /// Returns `StorageError::Backend` if `max_blob_size` is outside
    /// the supported range.
    pub fn validate(self) -> Result<Self, StorageError> {
        if self.max_blob_size < Self::MIN_BLOB_SIZE {
            return Err(StorageError::Backend(format!(
                "max_blob_size must be at least {} bytes (got {})",
                Self::MIN_BLOB_SIZE,
                self.max_blob_size
            )));
        }

        if self.max_blob_size > Self::MAX_BLOB_SIZE {
            return Err(StorageError::Backend(format!(
                "max_blob_size must be at most {} bytes (got {})",
                Self::MAX_BLOB_SIZE,
                self.max_blob_size
            )));
        }

        Ok(self)
    }
}

/// Open or create a persistent blob store at the given path.
///
/// # Arguments
/// * `path` - Directory to store the blob files
/// * `config` - Optional configuration (uses defaults if None)
///
/// # Errors
/// - If the path cannot be created or accessed
/// - If another process holds the lock
/// - If the configuration is out of range
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use reviewledger::storage::open_store;
/// use reviewledger::{LedgerConfig, LedgerRepository};
///
/// let store = open_store("./cinereview.data", None)?;
/// let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default())?;
/// let ledger = repo.load_or_empty();
/// # Ok::<(), reviewledger::LedgerError>(())
/// ```
pub fn open_store(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> Result<FileKvStore, StorageError> {
    let cfg = config.unwrap_or_default().validate()?;
    FileKvStore::open(path.as_ref(), cfg)
}
