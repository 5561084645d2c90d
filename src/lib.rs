//! # reviewledger - Local rating and review ledger
//!
//! reviewledger keeps a user's personal movie and show reviews on the device.
//! A [`Ledger`] is an ordered, id-unique list of [`ReviewRecord`]s that is
//! hydrated from a key-value blob store, merged in memory, and written back
//! as one blob after every change.
//!
//! ## Core Concepts
//!
//! - **ReviewRecord**: one review and score (1 to 10) for one catalog item
//! - **Ledger**: the ordered collection of records, at most one per item
//! - **Upsert**: insert-or-update keyed by item id; updates keep their position
//! - **KvStore**: the durable blob slots the ledger is saved into
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use reviewledger::{InMemoryKvStore, LedgerConfig, LedgerRepository, ReviewCandidate};
//!
//! let repo = LedgerRepository::new(Arc::new(InMemoryKvStore::new()), &LedgerConfig::default())?;
//!
//! let ledger = repo.load()?;
//! let ledger = ledger.upsert(&ReviewCandidate::new(42, "X", "Great", 8))?;
//! repo.save(&ledger)?;
//!
//! assert_eq!(repo.load()?.len(), 1);
//! # Ok::<(), reviewledger::LedgerError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod record;
pub mod session;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use config::{AppConfig, LedgerConfig};
pub use error::{LedgerError, LedgerResult, ValidationError};
pub use ledger::{Ledger, LedgerRepository, UpsertKind};
pub use record::{ItemId, ReviewCandidate, ReviewRecord, Score, ScoreInput};
pub use session::{RatingSession, UserProfile, UserSession};
pub use storage::{InMemoryKvStore, KvStore, StorageError};

#[cfg(feature = "persistent")]
pub use storage::{open_store, FileKvStore, PersistentConfig};
