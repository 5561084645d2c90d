//! Configuration for the ledger and its storage.
//!
//! [`LedgerConfig`] decides which storage key a ledger owns. [`AppConfig`]
//! bundles everything the command-line front end needs and can be read from
//! the environment.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

#[cfg(feature = "persistent")]
use crate::storage::PersistentConfig;
use crate::storage::StorageError;

/// Key the mobile client used for the rated list.
pub const DEFAULT_LEDGER_KEY: &str = "ratedMovies";

/// Default data directory for the persistent store.
pub const DEFAULT_DATA_DIR: &str = "./cinereview.data";

/// Environment variable naming the data directory.
pub const ENV_DATA_DIR: &str = "REVIEWLEDGER_DATA_DIR";
/// Environment variable toggling fsync on every write.
pub const ENV_SYNC_ON_WRITE: &str = "REVIEWLEDGER_SYNC_ON_WRITE";
/// Environment variable overriding the ledger key.
pub const ENV_LEDGER_KEY: &str = "REVIEWLEDGER_LEDGER_KEY";

/// Which storage slot a ledger lives in.
///
/// By default every identity on a device shares one key. Call
/// [`LedgerConfig::for_user`] to give each identity its own ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Base storage key.
    pub key: String,
    /// Optional suffix separating ledgers of different users.
    pub namespace: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_LEDGER_KEY.to_string(),
            namespace: None,
        }
    }
}

impl LedgerConfig {
    /// Scope the ledger to one user id.
    #[must_use]
    pub fn for_user(mut self, uid: impl Into<String>) -> Self {
        self.namespace = Some(uid.into());
        self
    }

    /// The full storage key, `key` or `key:namespace`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{ns}", self.key),
            None => self.key.clone(),
        }
    }
}

/// Runtime configuration for the command-line front end.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory of the persistent store.
    pub data_dir: PathBuf,
    /// Ledger key selection.
    pub ledger: LedgerConfig,
    /// Persistent store tuning.
    #[cfg(feature = "persistent")]
    pub persistent: PersistentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            ledger: LedgerConfig::default(),
            #[cfg(feature = "persistent")]
            persistent: PersistentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `StorageError::Backend` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    /// Returns `StorageError::Backend` if a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        } else {
            info!("{ENV_DATA_DIR} not set, using default: {DEFAULT_DATA_DIR}");
        }

        if let Some(key) = lookup(ENV_LEDGER_KEY) {
            config.ledger.key = key;
        }

        let sync_on_write = parse_var::<bool>(&lookup, ENV_SYNC_ON_WRITE)?;
        #[cfg(feature = "persistent")]
        {
            if let Some(sync) = sync_on_write {
                config.persistent.sync_on_write = sync;
            }
        }
        #[cfg(not(feature = "persistent"))]
        let _ = sync_on_write;

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, StorageError>
where
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|e| {
        warn!("Invalid {key} value: {e}");
        StorageError::Backend(format!("invalid {key}={raw:?}: {e}"))
    })
}
