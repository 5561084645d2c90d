//! File-backed [`KvStore`] implementation.
//!
//! Each key owns exactly one blob file. Writes build the complete file next to
//! the target and rename it into place, so readers only ever observe the old
//! value or the new one.

use std::fs::{self, File};
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::storage::traits::{validate_key, KvStore, StorageError};

use super::codec;
use super::file_lock::FileLock;
use super::PersistentConfig;

const BLOB_EXTENSION: &str = "blob";
const TEMP_EXTENSION: &str = "blob.tmp";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

fn read_err(path: &Path, err: &std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
            StorageError::Corrupted(format!("{}: {err}", path.display()))
        }
        _ => StorageError::Io(format!("failed to read {}: {err}", path.display())),
    }
}

/// Durable blob store rooted at a single directory.
///
/// Holds an exclusive [`FileLock`] on the directory for its whole lifetime.
#[derive(Debug)]
pub struct FileKvStore {
    dir: PathBuf,
    _lock: FileLock,
    config: PersistentConfig,
    /// Serializes temp-file writes and renames within this process.
    write_guard: Mutex<()>,
}

impl FileKvStore {
    /// Open or create a store directory.
    ///
    /// Leftover temp files from an interrupted write are discarded; the blob
    /// they were meant to replace is still intact.
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        let config = config.validate()?;

        fs::create_dir_all(dir).map_err(|e| {
            StorageError::Io(format!("failed to create store directory {}: {e}", dir.display()))
        })?;

        let lock = FileLock::acquire(dir).map_err(|e| {
            if e.kind() == ErrorKind::WouldBlock {
                StorageError::Locked(e.to_string())
            } else {
                StorageError::Io(format!("failed to acquire lock: {e}"))
            }
        })?;

        let store = Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            config,
            write_guard: Mutex::new(()),
        };
        store.discard_stale_temp_files()?;

        info!(dir = %store.dir.display(), sync_on_write = store.config.sync_on_write, "opened blob store");
        Ok(store)
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The effective configuration.
    #[must_use]
    pub const fn config(&self) -> &PersistentConfig {
        &self.config
    }

    /// Path of the blob file that holds `key`.
    ///
    /// File names are the blake3 hash of the key, so arbitrary keys never
    /// reach the filesystem as path components.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = blake3::hash(key.as_bytes());
        self.dir.join(format!("{}.{BLOB_EXTENSION}", digest.to_hex()))
    }

    fn discard_stale_temp_files(&self) -> Result<(), StorageError> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TEMP_EXTENSION));
            if is_temp && path.is_file() {
                warn!(path = %path.display(), "discarding temp file from interrupted write");
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn sync_dir(&self) -> Result<(), StorageError> {
        #[cfg(unix)]
        {
            File::open(&self.dir)?.sync_all()?;
        }
        Ok(())
    }

    fn write_temp(&self, tmp_path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(tmp_path)?;
        file.write_all(contents)?;
        file.flush()?;
        if self.config.sync_on_write {
            file.sync_all()?;
        }
        Ok(())
    }

    fn write_atomically(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let tmp_path = path.with_extension(TEMP_EXTENSION);

        let result = self
            .write_temp(&tmp_path, contents)
            .and_then(|()| fs::rename(&tmp_path, path));

        if result.is_err() && tmp_path.is_file() {
            // Best effort: the next open also sweeps leftovers
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_err(&path, &e)),
        };

        let mut cursor = Cursor::new(bytes);
        codec::read_header(&mut cursor).map_err(|e| read_err(&path, &e))?;
        if let Some(len) = codec::declared_len(&cursor.get_ref()[codec::HEADER_LEN..]) {
            let size = len as u64;
            if size > self.config.max_blob_size {
                warn!(key, size, max = self.config.max_blob_size, "stored blob exceeds configured limit");
                return Err(StorageError::TooLarge {
                    size,
                    max: self.config.max_blob_size,
                });
            }
        }
        let max_len = usize::try_from(self.config.max_blob_size).unwrap_or(usize::MAX);
        let payload = codec::decode_frame(&mut cursor, max_len).map_err(|e| read_err(&path, &e))?;

        debug!(key, bytes = payload.len(), "read blob");
        Ok(Some(payload))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;

        let size = value.len() as u64;
        if size > self.config.max_blob_size {
            return Err(StorageError::TooLarge {
                size,
                max: self.config.max_blob_size,
            });
        }

        let mut contents = Vec::with_capacity(codec::HEADER_LEN + value.len() + 9);
        codec::write_header(&mut contents)?;
        contents.extend_from_slice(&codec::encode_frame(value)?);

        let path = self.path_for(key);
        let _guard = self.write_guard.lock().map_err(|_| lock_err("blob store write"))?;
        self.write_atomically(&path, &contents).map_err(|e| {
            StorageError::Io(format!("failed to write {}: {e}", path.display()))
        })?;
        if self.config.sync_on_write {
            self.sync_dir()?;
        }

        debug!(key, bytes = value.len(), "wrote blob");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);

        let _guard = self.write_guard.lock().map_err(|_| lock_err("blob store write"))?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::Io(format!("failed to remove {}: {e}", path.display())))
            }
        }
        if self.config.sync_on_write {
            self.sync_dir()?;
        }

        debug!(key, "removed blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_config() -> PersistentConfig {
        PersistentConfig {
            sync_on_write: false,
            max_blob_size: 2048,
        }
    }

    #[test]
    fn set_get_remove() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), small_config()).unwrap();

        assert_eq!(store.get("ratedMovies").unwrap(), None);
        store.set("ratedMovies", b"[]").unwrap();
        assert_eq!(store.get("ratedMovies").unwrap().as_deref(), Some(&b"[]"[..]));

        store.remove("ratedMovies").unwrap();
        assert_eq!(store.get("ratedMovies").unwrap(), None);
        store.remove("ratedMovies").unwrap();
    }

    #[test]
    fn path_for_is_stable_and_key_specific() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), small_config()).unwrap();

        assert_eq!(store.path_for("user"), store.path_for("user"));
        assert_ne!(store.path_for("user"), store.path_for("ratedMovies"));
        assert!(store.path_for("user").starts_with(dir.path()));
    }

    #[test]
    fn rejects_value_above_limit() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), small_config()).unwrap();

        let big = vec![b'x'; 4096];
        let err = store.set("ratedMovies", &big).unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 4096, max: 2048 }));
        assert_eq!(store.get("ratedMovies").unwrap(), None);
    }

    #[test]
    fn oversized_blob_on_read_is_too_large_not_corrupt() {
        let dir = tempdir().unwrap();
        let roomy = PersistentConfig {
            sync_on_write: false,
            max_blob_size: 8192,
        };
        {
            let store = FileKvStore::open(dir.path(), roomy.clone()).unwrap();
            store.set("ratedMovies", &vec![b'x'; 4096]).unwrap();
        }

        let store = FileKvStore::open(dir.path(), small_config()).unwrap();
        let err = store.get("ratedMovies").unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 4096, max: 2048 }));

        // The blob itself is untouched and readable again under the old limit
        drop(store);
        let store = FileKvStore::open(dir.path(), roomy).unwrap();
        assert_eq!(store.get("ratedMovies").unwrap().map(|v| v.len()), Some(4096));
    }

    #[test]
    fn bad_magic_is_reported_as_corruption() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), small_config()).unwrap();

        fs::write(store.path_for("ratedMovies"), b"not a blob file").unwrap();
        assert!(matches!(store.get("ratedMovies"), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn open_sweeps_stale_temp_files() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join(format!("deadbeef.{TEMP_EXTENSION}"));
        fs::write(&stale, b"half written").unwrap();

        let _store = FileKvStore::open(dir.path(), small_config()).unwrap();
        assert!(!stale.exists());
    }
}
