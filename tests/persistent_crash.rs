//! Crash and corruption tests for the persistent blob store.
//!
//! These tests verify that the storage layer correctly handles:
//! - Reopening a directory after the process goes away
//! - Interrupted writes (stale temp files, failed renames)
//! - CRC corruption and truncation of stored blobs
//! - A second store opening a locked directory
//! - Reopening with a lower size limit than the blob was written with

#![cfg(feature = "persistent")]

use std::fs;
use std::sync::Arc;

use reviewledger::storage::{open_store, KvStore, PersistentConfig, StorageError};
use reviewledger::{ItemId, Ledger, LedgerConfig, LedgerError, LedgerRepository, ReviewCandidate};
use tempfile::tempdir;

fn fast_config() -> Option<PersistentConfig> {
    Some(PersistentConfig {
        sync_on_write: false,
        ..PersistentConfig::default()
    })
}

fn sample_ledger(n: i64) -> Ledger {
    let mut ledger = Ledger::new();
    for id in 0..n {
        ledger
            .upsert_in_place(&ReviewCandidate::new(id, format!("movie_{id}"), "worth a watch", 7u8))
            .unwrap();
    }
    ledger
}

/// Data written before the store is dropped is visible after reopening.
#[test]
fn test_ledger_survives_reopen() {
    let dir = tempdir().unwrap();
    let ledger = sample_ledger(5);

    {
        let store = open_store(dir.path(), None).unwrap();
        let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default()).unwrap();
        repo.save(&ledger).unwrap();
    }

    // Reopen twice (simulates multiple restarts)
    for _ in 0..2 {
        let store = open_store(dir.path(), None).unwrap();
        let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default()).unwrap();
        let loaded = repo.load().unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.find_by_id(&ItemId::Int(3)).unwrap().title, "movie_3");
    }
}

/// Flipping a byte inside the blob is reported as corruption, not as absence.
#[test]
fn test_crc_corruption_detection() {
    let dir = tempdir().unwrap();
    let blob_path;

    {
        let store = open_store(dir.path(), fast_config()).unwrap();
        blob_path = store.path_for("ratedMovies");
        let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default()).unwrap();
        repo.save(&sample_ledger(3)).unwrap();
    }

    let mut content = fs::read(&blob_path).unwrap();
    // Skip header (RVLG + version) and frame prefix, corrupt the payload
    let idx = std::cmp::max(10, content.len() / 2);
    content[idx] ^= 0xFF;
    fs::write(&blob_path, &content).unwrap();

    let store = open_store(dir.path(), fast_config()).unwrap();
    assert!(matches!(store.get("ratedMovies"), Err(StorageError::Corrupted(_))));

    let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default()).unwrap();
    let err = repo.load().unwrap_err();
    assert!(err.is_corrupt(), "expected corruption, got {err}");
    assert!(repo.load_or_empty().is_empty());
}

/// A blob cut short (crash mid-copy by an external tool) is corruption.
#[test]
fn test_truncated_blob_detection() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), fast_config()).unwrap();
    store.set("ratedMovies", &sample_ledger(4).to_bytes().unwrap()).unwrap();

    let path = store.path_for("ratedMovies");
    let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    let size = file.metadata().unwrap().len();
    file.set_len(size * 4 / 5).unwrap();

    assert!(matches!(store.get("ratedMovies"), Err(StorageError::Corrupted(_))));
}

/// A write that fails before the rename leaves the previous value readable.
#[test]
fn test_failed_write_keeps_previous_value() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), fast_config()).unwrap();
    let first = sample_ledger(2);
    store.set("ratedMovies", &first.to_bytes().unwrap()).unwrap();

    // Occupy the temp path with a directory so creating the temp file fails
    let tmp_path = store.path_for("ratedMovies").with_extension("blob.tmp");
    fs::create_dir(&tmp_path).unwrap();

    let err = store.set("ratedMovies", &sample_ledger(6).to_bytes().unwrap()).unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
    assert!(err.is_retryable());

    let stored = store.get("ratedMovies").unwrap().unwrap();
    assert_eq!(Ledger::from_bytes(&stored).unwrap(), first);
}

/// Temp files left by a crash between write and rename are ignored on reopen.
#[test]
fn test_interrupted_write_recovery() {
    let dir = tempdir().unwrap();
    let first = sample_ledger(3);
    let tmp_path;

    {
        let store = open_store(dir.path(), fast_config()).unwrap();
        store.set("ratedMovies", &first.to_bytes().unwrap()).unwrap();
        tmp_path = store.path_for("ratedMovies").with_extension("blob.tmp");
    }

    // Simulate a crash after a partial temp write
    fs::write(&tmp_path, b"RVLG\x01\x01\xff\xff").unwrap();

    let store = open_store(dir.path(), fast_config()).unwrap();
    assert!(!tmp_path.exists());
    let stored = store.get("ratedMovies").unwrap().unwrap();
    assert_eq!(Ledger::from_bytes(&stored).unwrap(), first);
}

/// Only one store may hold a directory at a time.
#[test]
fn test_second_open_is_locked_out() {
    let dir = tempdir().unwrap();
    let _first = open_store(dir.path(), fast_config()).unwrap();

    let err = open_store(dir.path(), fast_config()).unwrap_err();
    assert!(matches!(err, StorageError::Locked(_)), "unexpected error: {err}");
}

/// Lowering the size limit makes an existing ledger unreadable, not corrupt.
#[test]
fn test_lowered_limit_is_not_corruption() {
    let dir = tempdir().unwrap();
    let ledger = sample_ledger(50);
    assert!(ledger.to_bytes().unwrap().len() > 1024);

    {
        let store = open_store(dir.path(), fast_config()).unwrap();
        let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default()).unwrap();
        repo.save(&ledger).unwrap();
    }

    let tight = Some(PersistentConfig {
        sync_on_write: false,
        max_blob_size: 1024,
    });
    let store = open_store(dir.path(), tight).unwrap();
    let repo = LedgerRepository::new(Arc::new(store), &LedgerConfig::default()).unwrap();
    let err = repo.load().unwrap_err();
    assert!(!err.is_corrupt(), "unexpected error: {err}");
    assert!(matches!(err, LedgerError::Storage(StorageError::TooLarge { max: 1024, .. })));
}
