//! Abstract storage trait for reviewledger.
//!
//! The ledger treats durable storage as a set of opaque blob slots addressed
//! by string keys. By using a trait, we enable:
//! - In-memory backends for testing and embedded use
//! - A persistent single-directory backend for production
//! - Fakes that inject failures in tests

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key does not have an accepted shape.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Underlying read or write failed.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Stored bytes failed an integrity check.
    #[error("Stored data corrupted: {0}")]
    Corrupted(String),

    /// Value exceeds the configured size limit.
    #[error("Value of {size} bytes exceeds maximum {max}")]
    TooLarge {
        /// Size of the rejected value.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    /// Another process holds the storage directory.
    #[error("Storage is locked: {0}")]
    Locked(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Returns true if repeating the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Locked(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._:@-]+$").expect("static key regex is valid"))
}

/// Validate a storage key.
///
/// # Errors
/// Returns `StorageError::InvalidKey` if the key is empty, longer than
/// [`MAX_KEY_LEN`], or contains characters outside `[A-Za-z0-9._:@-]`.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "key length must be 1..={MAX_KEY_LEN} (got {})",
            key.len()
        )));
    }
    if !key_pattern().is_match(key) {
        return Err(StorageError::InvalidKey(format!("unsupported characters in {key:?}")));
    }
    Ok(())
}

/// Durable key-value blob store.
///
/// # Contract
/// - `set` replaces any prior value under the key as a single unit
/// - A failed `set` leaves the previous value readable
/// - No multi-key transactional semantics are assumed
pub trait KvStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, overwriting any prior value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
